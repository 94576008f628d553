//! Wrapping callables and binding call-site arguments.
//!
//! [`function`] introspects a callable once and returns a [`Function`]
//! handle. Each [`Function::call`] binds one list of argument literals and
//! yields an [`Invocation`], which is consumed by exactly one assertion (see
//! [`crate::assert`]).
//!
//! ```rust
//! use tf::{function, vals, Suite};
//!
//! fn remainder(a: i32, b: i32) -> (i32, i32) {
//!     (a / b, a % b)
//! }
//!
//! let suite = Suite::new("remainder");
//! let remainder = function(&suite, remainder);
//! remainder.call(vals![10, 3]).returns(vals![3, 1]);
//! remainder.call(vals![10, 2]).returns(vals![5, 0]);
//! suite.finish();
//! ```

use std::{fmt, marker::PhantomData};

use tracing::debug;

use crate::{signature::{ArgList, Callable, Signature}, suite::Suite, value::Value};

/// A wrapped callable: the callable itself plus its introspected signature.
///
/// Immutable after creation. The naming counter lives in the owning
/// [`Suite`], so two handles with the same display name share one sequence.
pub struct Function<'s, F, Args> {
    pub(crate) suite: &'s Suite,
    pub(crate) callable: F,
    signature: Signature,
    _args: PhantomData<fn(Args)>,
}

/// Wraps `callable` for parametrized assertions within `suite`.
pub fn function<F, Args>(suite: &Suite, callable: F) -> Function<'_, F, Args>
where
    F: Callable<Args>,
    Args: ArgList,
{
    Function::wrap(suite, Signature::of::<F, Args>(), callable)
}

impl<'s, F, Args> Function<'s, F, Args>
where
    F: Callable<Args>,
    Args: ArgList,
{
    /// Wraps `callable` under an explicit display name instead of the one
    /// derived from its symbol. Closures all display as `closure` otherwise.
    pub fn named(suite: &'s Suite, name: impl Into<String>, callable: F) -> Self {
        let mut signature = Signature::of::<F, Args>();
        signature.name = name.into();
        Self::wrap(suite, signature, callable)
    }

    fn wrap(suite: &'s Suite, signature: Signature, callable: F) -> Self {
        debug!(
            function = %signature.name,
            params = ?signature.params,
            returns = ?signature.returns,
            "wrapped callable"
        );
        Self {
            suite,
            callable,
            signature,
            _args: PhantomData,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Binds one list of argument literals. Nothing runs until an assertion
    /// is made on the returned invocation.
    pub fn call(&self, args: Vec<Value>) -> Invocation<'_, 's, F, Args> {
        Invocation {
            function: self,
            args,
        }
    }

    /// Takes the next `name#n` from the suite's registry.
    pub(crate) fn next_test_name(&self) -> String {
        self.suite.calls().next_name(&self.signature.name)
    }
}

impl<F, Args> fmt::Debug for Function<'_, F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("suite", &self.suite.name())
            .field("signature", &self.signature)
            .finish()
    }
}

/// One call-with-arguments, waiting for its assertion.
#[must_use = "an invocation does nothing until an assertion is made on it"]
pub struct Invocation<'f, 's, F, Args> {
    pub(crate) function: &'f Function<'s, F, Args>,
    pub(crate) args: Vec<Value>,
}

impl<F, Args> fmt::Debug for Invocation<'_, '_, F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("function", &self.function.signature.name)
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::vals;

    fn double(n: u32) -> u32 {
        n * 2
    }

    fn quiet_suite() -> Suite {
        Suite::with_config("unit", SuiteConfig::default().colors(false))
    }

    #[test]
    fn wrapping_captures_signature() {
        let suite = quiet_suite();
        let f = function(&suite, double);
        assert_eq!(f.name(), "double");
        assert_eq!(f.signature().params, vec!["u32"]);
        assert_eq!(f.signature().returns, vec!["u32"]);
        suite.finish();
    }

    #[test]
    fn named_overrides_display_name() {
        let suite = quiet_suite();
        let f = Function::named(&suite, "negate", |b: bool| !b);
        assert_eq!(f.name(), "negate");
        assert_eq!(f.next_test_name(), "negate#1");
        assert_eq!(f.next_test_name(), "negate#2");
        suite.finish();
    }

    #[test]
    fn binding_arguments_runs_nothing() {
        let suite = quiet_suite();
        let f = function(&suite, double);
        let invocation = f.call(vals![2]);
        assert_eq!(invocation.args.len(), 1);
        assert_eq!(suite.calls().count("double"), 0);
        drop(invocation);
        suite.finish();
    }
}
