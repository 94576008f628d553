//! Type introspection of wrapped callables.
//!
//! Rust has no runtime reflection over function signatures, so the shape of a
//! callable is recovered through traits implemented for every supported arity:
//!
//! - [`ArgList`] describes a parameter tuple and builds one from literals.
//! - [`ReturnList`] describes what a callable returns. `()` is zero values, a
//!   tuple `(A, B, ..)` is one value per element and any other [`Coerce`]
//!   type is a single value.
//! - [`Callable`] ties the two together for every `Fn(A, B, ..) -> R`.
//!
//! [`Signature`] is the one-time, immutable summary captured when a callable is
//! wrapped.

use std::error::Error;

use crate::{coerce::{coerce_value, Coerce}, error::TfError, value::Value};

/// Parameter types, return types and display name of a wrapped callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<&'static str>,
    pub returns: Vec<&'static str>,
}

impl Signature {
    /// Introspects `F` as a callable over the parameter tuple `Args`.
    pub fn of<F, Args>() -> Self
    where
        F: Callable<Args>,
        Args: ArgList,
    {
        Self {
            name: display_name(std::any::type_name::<F>()),
            params: Args::type_names(),
            returns: <F::Output as ReturnList>::type_names(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Reduces a fully-qualified symbol to the bare identifier used as a sub-test
/// name prefix.
///
/// ```rust
/// use tf::signature::display_name;
/// assert_eq!(display_name("my_crate::maths::remainder"), "remainder");
/// assert_eq!(display_name("my_crate::Item::add"), "add");
/// assert_eq!(display_name("my_crate::tests::casting::{{closure}}"), "closure");
/// assert_eq!(display_name("my_crate::identity<alloc::string::String>"), "identity");
/// ```
pub fn display_name(qualified: &str) -> String {
    let path = strip_generics(qualified);
    let last = path.rsplit("::").next().unwrap_or(&path);
    let bare = last.trim_start_matches('{').trim_end_matches('}');
    if bare.is_empty() {
        "func".to_string()
    } else {
        bare.to_string()
    }
}

fn strip_generics(qualified: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(qualified.len());
    for c in qualified.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

// ============================================================================
// ARGUMENTS
// ============================================================================

/// A tuple of parameter types.
pub trait ArgList: Sized {
    const ARITY: usize;

    fn type_names() -> Vec<&'static str>;

    /// Coerces one literal per parameter, in order.
    fn from_values(values: Vec<Value>) -> Result<Self, TfError>;
}

fn next_arg<T: Coerce>(
    values: &mut impl Iterator<Item = (usize, Value)>,
    arity: usize,
) -> Result<T, TfError> {
    let (position, value) = values.next().ok_or(TfError::ArgumentCount {
        expected: arity,
        actual: 0,
    })?;
    coerce_value::<T>(value).map_err(|source| TfError::Argument {
        position: position + 1,
        target: T::type_name(),
        source,
    })
}

fn next_expected<T: Coerce>(
    values: &mut impl Iterator<Item = (usize, Value)>,
    arity: usize,
) -> Result<T, TfError> {
    let (position, value) = values.next().ok_or(TfError::ReturnCount {
        expected: arity,
        actual: 0,
    })?;
    coerce_value::<T>(value).map_err(|source| TfError::Expectation {
        position: position + 1,
        target: T::type_name(),
        source,
    })
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! arg_list {
    ($($A:ident),*) => {
        impl<$($A: Coerce),*> ArgList for ($($A,)*) {
            const ARITY: usize = count!($($A)*);

            fn type_names() -> Vec<&'static str> {
                vec![$(<$A as Coerce>::type_name()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn from_values(values: Vec<Value>) -> Result<Self, TfError> {
                if values.len() != <Self as ArgList>::ARITY {
                    return Err(TfError::ArgumentCount {
                        expected: <Self as ArgList>::ARITY,
                        actual: values.len(),
                    });
                }
                let mut values = values.into_iter().enumerate();
                Ok(($(next_arg::<$A>(&mut values, <Self as ArgList>::ARITY)?,)*))
            }
        }
    };
}

arg_list!();
arg_list!(A1);
arg_list!(A1, A2);
arg_list!(A1, A2, A3);
arg_list!(A1, A2, A3, A4);
arg_list!(A1, A2, A3, A4, A5);
arg_list!(A1, A2, A3, A4, A5, A6);
arg_list!(A1, A2, A3, A4, A5, A6, A7);
arg_list!(A1, A2, A3, A4, A5, A6, A7, A8);

// ============================================================================
// RETURN VALUES
// ============================================================================

/// What the last return value says about errors.
#[derive(Debug)]
pub enum TrailingError<'a> {
    /// The callable returns nothing at all.
    Nothing,
    /// The last return value cannot carry an error.
    NotAnError(&'static str),
    /// The last return value can carry an error but does not.
    Absent,
    Present(&'a (dyn Error + 'static)),
}

fn trailing<T: Coerce>(value: &T) -> TrailingError<'_> {
    if !T::is_error_type() {
        return TrailingError::NotAnError(T::type_name());
    }
    match value.as_error() {
        Some(err) => TrailingError::Present(err),
        None => TrailingError::Absent,
    }
}

/// The ordered return values of a callable.
pub trait ReturnList: Sized {
    const ARITY: usize;

    fn type_names() -> Vec<&'static str>;

    /// Coerces one expected literal per return value, in order.
    fn from_values(values: Vec<Value>) -> Result<Self, TfError>;

    /// One-based positions at which `self` and `other` differ.
    fn differences(&self, other: &Self) -> Vec<usize>;

    fn render(&self) -> Vec<String>;

    fn trailing_error(&self) -> TrailingError<'_>;
}

impl ReturnList for () {
    const ARITY: usize = 0;

    fn type_names() -> Vec<&'static str> {
        Vec::new()
    }

    fn from_values(values: Vec<Value>) -> Result<Self, TfError> {
        if !values.is_empty() {
            return Err(TfError::ReturnCount {
                expected: 0,
                actual: values.len(),
            });
        }
        Ok(())
    }

    fn differences(&self, _other: &Self) -> Vec<usize> {
        Vec::new()
    }

    fn render(&self) -> Vec<String> {
        Vec::new()
    }

    fn trailing_error(&self) -> TrailingError<'_> {
        TrailingError::Nothing
    }
}

impl<T: Coerce> ReturnList for T {
    const ARITY: usize = 1;

    fn type_names() -> Vec<&'static str> {
        vec![T::type_name()]
    }

    fn from_values(values: Vec<Value>) -> Result<Self, TfError> {
        if values.len() != 1 {
            return Err(TfError::ReturnCount {
                expected: 1,
                actual: values.len(),
            });
        }
        let mut values = values.into_iter().enumerate();
        next_expected::<T>(&mut values, 1)
    }

    fn differences(&self, other: &Self) -> Vec<usize> {
        if Coerce::same(self, other) {
            Vec::new()
        } else {
            vec![1]
        }
    }

    fn render(&self) -> Vec<String> {
        vec![Coerce::render(self)]
    }

    fn trailing_error(&self) -> TrailingError<'_> {
        trailing(self)
    }
}

macro_rules! return_tuple {
    ($($T:ident $idx:tt),+) => {
        impl<$($T: Coerce),+> ReturnList for ($($T,)+) {
            const ARITY: usize = count!($($T)+);

            fn type_names() -> Vec<&'static str> {
                vec![$(<$T as Coerce>::type_name()),+]
            }

            fn from_values(values: Vec<Value>) -> Result<Self, TfError> {
                if values.len() != <Self as ReturnList>::ARITY {
                    return Err(TfError::ReturnCount {
                        expected: <Self as ReturnList>::ARITY,
                        actual: values.len(),
                    });
                }
                let mut values = values.into_iter().enumerate();
                Ok(($(next_expected::<$T>(&mut values, <Self as ReturnList>::ARITY)?,)+))
            }

            fn differences(&self, other: &Self) -> Vec<usize> {
                let mut positions = Vec::new();
                $(
                    if !Coerce::same(&self.$idx, &other.$idx) {
                        positions.push($idx + 1);
                    }
                )+
                positions
            }

            fn render(&self) -> Vec<String> {
                vec![$(Coerce::render(&self.$idx)),+]
            }

            #[allow(unused_assignments)]
            fn trailing_error(&self) -> TrailingError<'_> {
                let mut last = TrailingError::Nothing;
                $(
                    last = trailing(&self.$idx);
                )+
                last
            }
        }
    };
}

return_tuple!(A 0, B 1);
return_tuple!(A 0, B 1, C 2);
return_tuple!(A 0, B 1, C 2, D 3);
return_tuple!(A 0, B 1, C 2, D 3, E 4);
return_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
return_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
return_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

// ============================================================================
// CALLABLES
// ============================================================================

/// A function or method value callable with the parameter tuple `Args`.
///
/// Implemented for every `Fn` of up to eight parameters whose parameters are
/// [`Coerce`] types and whose return type is a [`ReturnList`]. Method
/// expressions such as `Item::add` take the receiver as the first parameter.
pub trait Callable<Args: ArgList> {
    type Output: ReturnList;

    fn call(&self, args: Args) -> Self::Output;
}

macro_rules! callable {
    ($($A:ident $a:ident),*) => {
        impl<Func, Out, $($A: Coerce),*> Callable<($($A,)*)> for Func
        where
            Func: Fn($($A),*) -> Out,
            Out: ReturnList,
        {
            type Output = Out;

            fn call(&self, args: ($($A,)*)) -> Out {
                let ($($a,)*) = args;
                (self)($($a),*)
            }
        }
    };
}

callable!();
callable!(A1 a1);
callable!(A1 a1, A2 a2);
callable!(A1 a1, A2 a2, A3 a3);
callable!(A1 a1, A2 a2, A3 a3, A4 a4);
callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vals;

    fn remainder(a: i32, b: i32) -> (i32, i32) {
        (a / b, a % b)
    }

    fn nothing() {}

    fn introspect<F, Args>(_f: &F) -> Signature
    where
        F: Callable<Args>,
        Args: ArgList,
    {
        Signature::of::<F, Args>()
    }

    #[test]
    fn introspects_free_functions() {
        let sig = introspect(&remainder);
        assert_eq!(sig.name, "remainder");
        assert_eq!(sig.params, vec!["i32", "i32"]);
        assert_eq!(sig.returns, vec!["i32", "i32"]);

        let sig = introspect(&nothing);
        assert_eq!(sig.name, "nothing");
        assert!(sig.params.is_empty());
        assert!(sig.returns.is_empty());
    }

    #[test]
    fn display_name_strips_generics_anywhere() {
        assert_eq!(display_name("a::run<i32>::{{closure}}"), "closure");
        assert_eq!(display_name("a::Wrapper<b::C>::get"), "get");
    }

    #[test]
    fn introspects_closures() {
        let sig = introspect(&|flag: bool| !flag);
        assert_eq!(sig.name, "closure");
        assert_eq!(sig.params, vec!["bool"]);
        assert_eq!(sig.returns, vec!["bool"]);
    }

    #[test]
    fn tuples_are_both_parameter_and_return_lists() {
        assert_eq!(<(i32, i32) as ArgList>::ARITY, 2);
        assert_eq!(<(i32, i32) as ReturnList>::ARITY, 2);
        assert_eq!(<(u8,) as ArgList>::ARITY, 1);
        assert_eq!(<() as ArgList>::ARITY, 0);
        assert_eq!(<() as ReturnList>::ARITY, 0);
    }

    #[test]
    fn argument_count_is_checked() {
        let err = <(i32, i32) as ArgList>::from_values(vals![1]).unwrap_err();
        assert!(matches!(
            err,
            TfError::ArgumentCount {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn argument_coercion_reports_position() {
        let err = <(i8, i8) as ArgList>::from_values(vals![1, 1000]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot coerce argument #2 into i8: 1000 is out of range for i8"
        );
    }

    #[test]
    fn tuple_returns_report_differing_positions() {
        let expected = <(i32, i32) as ReturnList>::from_values(vals![3, 2]).unwrap();
        assert_eq!(expected.differences(&(3, 1)), vec![2]);
        assert!(expected.differences(&(3, 2)).is_empty());
    }

    #[test]
    fn trailing_error_follows_last_value() {
        assert!(matches!(().trailing_error(), TrailingError::Nothing));
        assert!(matches!(
            5i32.trailing_error(),
            TrailingError::NotAnError("i32")
        ));
        let ok: (i32, Result<(), std::fmt::Error>) = (1, Ok(()));
        assert!(matches!(ok.trailing_error(), TrailingError::Absent));
        let err: (i32, Result<(), std::fmt::Error>) = (1, Err(std::fmt::Error));
        assert!(matches!(err.trailing_error(), TrailingError::Present(_)));
    }
}
