//! Literal values supplied by test authors.
//!
//! Arguments and expectations are written as loosely-typed literals and only
//! pinned to a concrete Rust type once the declared parameter or return type
//! at their position is known (see [`crate::coerce`]). [`Value::Nil`] is the
//! untyped nil marker: it always resolves to the zero value of that type.

use std::{any::Any, fmt};

/// The untyped nil marker.
pub const NIL: Value = Value::Nil;

/// A caller-supplied literal.
///
/// # Examples
///
/// ```rust
/// use tf::{Value, NIL};
/// let n = Value::from(3);
/// assert_eq!(n.kind(), "int");
/// assert!(NIL.is_nil());
/// assert_eq!(Value::from("boom").to_string(), "boom");
/// ```
#[derive(Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i128),
    Float(f64),
    Char(char),
    Str(String),
    List(Vec<Value>),
    Opaque(Opaque),
}

/// A value of an arbitrary Rust type, passed through coercion unchanged when
/// the declared type matches exactly.
pub struct Opaque {
    type_name: &'static str,
    value: Box<dyn Any>,
}

impl Opaque {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Wraps an already boxed value whose concrete type is unknown.
    pub fn from_boxed(value: Box<dyn Any>) -> Self {
        Self {
            type_name: "opaque value",
            value,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the inner value out if it is a `T`, handing the opaque back otherwise.
    pub fn take<T: Any>(self) -> Result<T, Opaque> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|value| Opaque { type_name, value })
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_name)
    }
}

impl Value {
    /// Wraps any value so it can be handed to a parameter of exactly that type.
    pub fn opaque<T: Any>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    /// Returns a short name for the literal's shape.
    ///
    /// ```rust
    /// use tf::Value;
    /// assert_eq!(Value::from(1.5).kind(), "float");
    /// assert_eq!(Value::opaque(vec![1u8]).kind(), "alloc::vec::Vec<u8>");
    /// ```
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Opaque(o) => o.type_name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Rebuilds a literal from a panic payload.
    ///
    /// Payloads produced by `panic!` are strings; anything raised through
    /// `std::panic::panic_any` is unpacked when it is one of the primitive
    /// literal types and kept opaque otherwise.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<String>() {
            Ok(message) => return Value::Str(*message),
            Err(payload) => payload,
        };
        if let Some(message) = payload.downcast_ref::<&'static str>() {
            return Value::Str((*message).to_string());
        }
        macro_rules! unpack {
            ($($t:ty => $variant:ident),* $(,)?) => {
                $(
                    if let Some(v) = payload.downcast_ref::<$t>() {
                        return Value::$variant((*v).into());
                    }
                )*
            };
        }
        unpack!(
            i8 => Int, i16 => Int, i32 => Int, i64 => Int, i128 => Int,
            u8 => Int, u16 => Int, u32 => Int, u64 => Int,
            f32 => Float, f64 => Float,
            bool => Bool, char => Char,
        );
        if let Some(v) = payload.downcast_ref::<isize>() {
            return Value::Int(*v as i128);
        }
        if let Some(v) = payload.downcast_ref::<usize>() {
            return Value::Int(*v as i128);
        }
        Value::Opaque(Opaque::from_boxed(payload))
    }
}

// Opaque values never compare equal: the concrete type is unknown here.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Opaque(o) => write!(f, "{:?}", o),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::List(items) => f.debug_list().entries(items).finish(),
            other => write!(f, "{}", other),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

macro_rules! from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i128)
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

/// Builds an ordered list of literals for arguments or expectations.
///
/// ```rust
/// use tf::{vals, Value, NIL};
/// let args = vals![10, "x", NIL];
/// assert_eq!(args.len(), 3);
/// assert!(args[2].is_nil());
/// ```
#[macro_export]
macro_rules! vals {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_default() {
        assert!(Value::default().is_nil());
        assert!(NIL.is_nil());
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        assert_eq!(Value::from(3), Value::from(3.0));
        assert_ne!(Value::from(3), Value::from(3.5));
    }

    #[test]
    fn opaque_values_never_compare_equal() {
        assert_ne!(Value::opaque(1u8), Value::opaque(1u8));
    }

    #[test]
    fn panic_payloads_are_unpacked() {
        assert_eq!(Value::from_panic(Box::new("boom")), Value::from("boom"));
        assert_eq!(
            Value::from_panic(Box::new(String::from("bang"))),
            Value::from("bang")
        );
        assert_eq!(Value::from_panic(Box::new(42u16)), Value::from(42));
        assert_eq!(Value::from_panic(Box::new(1.5f64)), Value::from(1.5));

        struct Custom;
        let value = Value::from_panic(Box::new(Custom));
        assert_eq!(value.kind(), "opaque value");
        assert_ne!(value, NIL);
    }

    #[test]
    fn opaque_take_round_trips_on_mismatch() {
        let opaque = Opaque::new(7u32);
        let opaque = opaque.take::<String>().unwrap_err();
        assert_eq!(opaque.take::<u32>().unwrap(), 7);
    }

    #[test]
    fn display_matches_debug_formatting_of_payloads() {
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1 2]");
        assert_eq!(format!("{:?}", Value::from(vec!["a"])), "[\"a\"]");
        assert_eq!(Value::from(2.0).to_string(), "2.0");
    }
}
