//! Coercion of literals into declared parameter and return types.
//!
//! A [`Coerce`] type knows its zero value, how to build itself from a
//! [`Value`], how to compare two of its values and how to render one for a
//! failure report. The nil marker is never handed to `Coerce::coerce`: it is
//! resolved to `Coerce::zero()` by [`coerce_value`] before any conversion.

use std::{error::Error, fmt::Debug};

use crate::{error::CoerceError, value::Value};

/// A type that literals can be coerced into.
pub trait Coerce: Sized + 'static {
    /// The canonical default for the type (numeric 0, empty string, `None`, ...).
    fn zero() -> Self;

    /// Converts a non-nil literal into `Self`.
    fn coerce(value: Value) -> Result<Self, CoerceError>;

    /// Structural equality used by the assertion layer.
    fn same(&self, other: &Self) -> bool;

    /// Debug-style rendering used in failure reports.
    fn render(&self) -> String;

    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether values of this type can carry an error.
    fn is_error_type() -> bool {
        false
    }

    /// The carried error, if any.
    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// Resolves nil to the zero value, passes exact opaque values through and
/// defers everything else to [`Coerce::coerce`].
pub fn coerce_value<T: Coerce>(value: Value) -> Result<T, CoerceError> {
    match value {
        Value::Nil => Ok(T::zero()),
        Value::Opaque(opaque) => match opaque.take::<T>() {
            Ok(v) => Ok(v),
            Err(opaque) => T::coerce(Value::Opaque(opaque)),
        },
        other => T::coerce(other),
    }
}

// ============================================================================
// PRIMITIVES
// ============================================================================

macro_rules! coerce_int {
    ($($t:ty),*) => {
        $(
            impl Coerce for $t {
                fn zero() -> Self {
                    0
                }

                fn coerce(value: Value) -> Result<Self, CoerceError> {
                    match value {
                        Value::Int(n) => <$t>::try_from(n)
                            .map_err(|_| CoerceError::out_of_range(n, Self::type_name())),
                        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                            let n = f as i128;
                            <$t>::try_from(n)
                                .map_err(|_| CoerceError::out_of_range(f, Self::type_name()))
                        }
                        other => Err(CoerceError::incompatible(&other, Self::type_name())),
                    }
                }

                fn same(&self, other: &Self) -> bool {
                    self == other
                }

                fn render(&self) -> String {
                    format!("{:?}", self)
                }
            }
        )*
    };
}

coerce_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! coerce_float {
    ($($t:ty),*) => {
        $(
            impl Coerce for $t {
                fn zero() -> Self {
                    0.0
                }

                fn coerce(value: Value) -> Result<Self, CoerceError> {
                    match value {
                        Value::Float(f) => Ok(f as $t),
                        Value::Int(n) => Ok(n as $t),
                        other => Err(CoerceError::incompatible(&other, Self::type_name())),
                    }
                }

                fn same(&self, other: &Self) -> bool {
                    self == other
                }

                fn render(&self) -> String {
                    format!("{:?}", self)
                }
            }
        )*
    };
}

coerce_float!(f32, f64);

impl Coerce for bool {
    fn zero() -> Self {
        false
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(CoerceError::incompatible(&other, Self::type_name())),
        }
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Coerce for char {
    fn zero() -> Self {
        '\0'
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Char(c) => Ok(c),
            Value::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(CoerceError::incompatible(&Value::Str(s), Self::type_name())),
                }
            }
            other => Err(CoerceError::incompatible(&other, Self::type_name())),
        }
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn render(&self) -> String {
        format!("{:?}", self)
    }
}

impl Coerce for String {
    fn zero() -> Self {
        String::new()
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(CoerceError::incompatible(&other, Self::type_name())),
        }
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn render(&self) -> String {
        format!("{:?}", self)
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

impl<T: Coerce> Coerce for Option<T> {
    fn zero() -> Self {
        None
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        coerce_value::<T>(value).map(Some)
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn render(&self) -> String {
        match self {
            Some(v) => format!("Some({})", v.render()),
            None => "None".to_string(),
        }
    }

    fn is_error_type() -> bool {
        T::is_error_type()
    }

    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        self.as_ref().and_then(Coerce::as_error)
    }
}

impl<T: Coerce> Coerce for Box<T> {
    fn zero() -> Self {
        Box::new(T::zero())
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        coerce_value::<T>(value).map(Box::new)
    }

    fn same(&self, other: &Self) -> bool {
        (**self).same(other)
    }

    fn render(&self) -> String {
        (**self).render()
    }

    fn is_error_type() -> bool {
        T::is_error_type()
    }

    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        (**self).as_error()
    }
}

impl<T: Coerce> Coerce for Vec<T> {
    fn zero() -> Self {
        Vec::new()
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::List(items) => items.into_iter().map(coerce_value::<T>).collect(),
            other => Err(CoerceError::incompatible(&other, Self::type_name())),
        }
    }

    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same(b))
    }

    fn render(&self) -> String {
        let items: Vec<String> = self.iter().map(Coerce::render).collect();
        format!("[{}]", items.join(", "))
    }
}

// ============================================================================
// RESULTS
// ============================================================================

fn same_error<E: Error>(a: &E, b: &E) -> bool {
    a.to_string() == b.to_string()
}

impl<T: Coerce, E: Error + 'static> Coerce for Result<T, E> {
    fn zero() -> Self {
        Ok(T::zero())
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Opaque(opaque) => match opaque.take::<E>() {
                Ok(err) => Ok(Err(err)),
                Err(opaque) => coerce_value::<T>(Value::Opaque(opaque)).map(Ok),
            },
            other => coerce_value::<T>(other).map(Ok),
        }
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.same(b),
            (Err(a), Err(b)) => same_error(a, b),
            _ => false,
        }
    }

    fn render(&self) -> String {
        match self {
            Ok(v) => format!("Ok({})", v.render()),
            Err(e) => format!("Err({:?})", e),
        }
    }

    fn is_error_type() -> bool {
        true
    }

    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        self.as_ref().err().map(|e| e as &(dyn Error + 'static))
    }
}

// `()` is not a `Coerce` type (it means "no return values"), so the common
// `Result<(), E>` shape gets its own impl.
impl<E: Error + 'static> Coerce for Result<(), E> {
    fn zero() -> Self {
        Ok(())
    }

    fn coerce(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Opaque(opaque) => match opaque.take::<E>() {
                Ok(err) => Ok(Err(err)),
                Err(opaque) => Err(CoerceError::incompatible(
                    &Value::Opaque(opaque),
                    Self::type_name(),
                )),
            },
            other => Err(CoerceError::incompatible(&other, Self::type_name())),
        }
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(()), Ok(())) => true,
            (Err(a), Err(b)) => same_error(a, b),
            _ => false,
        }
    }

    fn render(&self) -> String {
        match self {
            Ok(()) => "Ok(())".to_string(),
            Err(e) => format!("Err({:?})", e),
        }
    }

    fn is_error_type() -> bool {
        true
    }

    fn as_error(&self) -> Option<&(dyn Error + 'static)> {
        self.as_ref().err().map(|e| e as &(dyn Error + 'static))
    }
}

/// Renders a value through its `Debug` impl; used by [`coercible!`](crate::coercible).
pub fn render_debug<T: Debug>(value: &T) -> String {
    format!("{:?}", value)
}

/// Makes user types usable as parameters and return values.
///
/// The type must implement `Default` (its zero value), `PartialEq` and
/// `Debug`. Values are passed with `Value::from(item)`, which wraps them
/// opaquely. Prefix a type with `error` to mark it as error-shaped so it can be
/// the trailing value inspected by `errors()`.
///
/// ```rust
/// #[derive(Debug, Default, PartialEq)]
/// struct Item {
///     a: f64,
/// }
/// tf::coercible!(Item);
/// let v = tf::Value::from(Item { a: 1.0 });
/// assert_eq!(v.kind(), std::any::type_name::<Item>());
/// ```
#[macro_export]
macro_rules! coercible {
    (@base $ty:ty, $is_error:tt) => {
        impl $crate::Coerce for $ty {
            fn zero() -> Self {
                <$ty as ::core::default::Default>::default()
            }

            fn coerce(value: $crate::Value) -> ::core::result::Result<Self, $crate::CoerceError> {
                ::core::result::Result::Err($crate::CoerceError::incompatible(
                    &value,
                    ::core::any::type_name::<$ty>(),
                ))
            }

            fn same(&self, other: &Self) -> bool {
                self == other
            }

            fn render(&self) -> ::std::string::String {
                $crate::coerce::render_debug(self)
            }

            $crate::coercible!(@error_shape $is_error);
        }

        impl ::core::convert::From<$ty> for $crate::Value {
            fn from(value: $ty) -> Self {
                $crate::Value::opaque(value)
            }
        }
    };
    (@error_shape true) => {
        fn is_error_type() -> bool {
            true
        }

        fn as_error(&self) -> ::core::option::Option<&(dyn ::std::error::Error + 'static)> {
            ::core::option::Option::Some(self as &(dyn ::std::error::Error + 'static))
        }
    };
    (@error_shape false) => {};
    ($(error $err:ty),+ $(,)?) => {
        $(
            $crate::coercible!(@base $err, true);
        )+
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::coercible!(@base $ty, false);
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[test]
    fn nil_resolves_to_zero_value() {
        assert_eq!(coerce_value::<i64>(Value::Nil).unwrap(), 0);
        assert_eq!(coerce_value::<String>(Value::Nil).unwrap(), "");
        assert_eq!(coerce_value::<Option<u8>>(Value::Nil).unwrap(), None);
        assert!(coerce_value::<Vec<bool>>(Value::Nil).unwrap().is_empty());
    }

    #[test]
    fn integers_cross_widths_when_in_range() {
        assert_eq!(coerce_value::<i8>(Value::from(100i64)).unwrap(), 100);
        assert_eq!(coerce_value::<u64>(Value::from(3i8)).unwrap(), 3);
        assert_eq!(
            coerce_value::<i8>(Value::from(300)).unwrap_err(),
            CoerceError::out_of_range(300, "i8")
        );
        assert!(coerce_value::<u32>(Value::from(-1)).is_err());
    }

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(coerce_value::<i32>(Value::from(4.0)).unwrap(), 4);
        assert!(coerce_value::<i32>(Value::from(4.5)).is_err());
        assert_eq!(coerce_value::<f64>(Value::from(4)).unwrap(), 4.0);
    }

    #[test]
    fn incompatible_literals_are_rejected() {
        let err = coerce_value::<bool>(Value::from("yes")).unwrap_err();
        assert_eq!(err.to_string(), "string value yes is not convertible to bool");
        assert!(coerce_value::<char>(Value::from("ab")).is_err());
        assert_eq!(coerce_value::<char>(Value::from("a")).unwrap(), 'a');
    }

    #[test]
    fn lists_coerce_element_wise() {
        let v: Vec<u16> = coerce_value(Value::from(vec![1, 2, 3])).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(v.render(), "[1, 2, 3]");
    }

    #[test]
    fn opaque_values_pass_through_exact_types() {
        let v: Vec<u8> = coerce_value(Value::opaque(vec![9u8])).unwrap();
        assert_eq!(v, vec![9]);
        assert!(coerce_value::<String>(Value::opaque(1u8)).is_err());
    }

    #[derive(Debug, PartialEq)]
    struct Oops(&'static str);

    impl fmt::Display for Oops {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for Oops {}

    #[test]
    fn results_carry_errors() {
        let ok: Result<i32, Oops> = coerce_value(Value::from(5)).unwrap();
        assert!(ok.same(&Ok(5)));
        assert!(ok.as_error().is_none());

        let err: Result<i32, Oops> = coerce_value(Value::opaque(Oops("bad"))).unwrap();
        assert!(err.same(&Err(Oops("bad"))));
        assert_eq!(err.as_error().map(|e| e.to_string()).as_deref(), Some("bad"));
        assert!(<Result<i32, Oops> as Coerce>::is_error_type());

        let unit: Result<(), Oops> = coerce_value(Value::Nil).unwrap();
        assert!(unit.same(&Ok(())));
    }

    #[test]
    fn options_inherit_error_shape() {
        assert!(!<Option<i32> as Coerce>::is_error_type());
        assert!(<Option<Result<(), Oops>> as Coerce>::is_error_type());
        assert_eq!(Some(3).render(), "Some(3)");
    }
}
