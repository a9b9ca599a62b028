//! Runtime type descriptors used to validate that a job declaration and the
//! worker bound to it agree on their signatures.

use std::{
    any::{TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

/// Identity of a concrete Rust type: its `TypeId` plus a printable name.
///
/// Equality and hashing only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// The tag of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full type name as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The declared shape of a parameter or return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// A fully resolved type.
    Concrete(TypeTag),
    /// A wrapper with type arguments, such as `CallHandle<bool>`.
    ///
    /// `raw` is the wrapper's name as written at the declaration site
    /// (the last path segment).
    Parameterized {
        /// The wrapper's name.
        raw: &'static str,
        /// The type arguments in order.
        args: Vec<TypeShape>,
    },
    /// A generic type parameter left unresolved.
    Variable(&'static str),
    /// A placeholder such as `_` or `impl Trait`.
    Wildcard,
}

impl TypeShape {
    /// The concrete shape of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeShape::Concrete(TypeTag::of::<T>())
    }

    /// A parameterized shape.
    pub fn parameterized(raw: &'static str, args: Vec<TypeShape>) -> Self {
        TypeShape::Parameterized { raw, args }
    }

    /// `true` if this shape, or any shape nested in it, is a type variable or
    /// a wildcard.
    pub fn has_unresolvable_type(&self) -> bool {
        match self {
            TypeShape::Concrete(_) => false,
            TypeShape::Parameterized { args, .. } => {
                args.iter().any(TypeShape::has_unresolvable_type)
            }
            TypeShape::Variable(_) | TypeShape::Wildcard => true,
        }
    }

    /// The wrapper name for parameterized shapes.
    pub fn raw_name(&self) -> Option<&'static str> {
        match self {
            TypeShape::Parameterized { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// The `index`-th type argument of a parameterized shape.
    pub fn parameter(&self, index: usize) -> Option<&TypeShape> {
        match self {
            TypeShape::Parameterized { args, .. } => args.get(index),
            _ => None,
        }
    }

    /// The tag of a concrete shape.
    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            TypeShape::Concrete(tag) => Some(*tag),
            _ => None,
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Concrete(tag) => write!(f, "{tag}"),
            TypeShape::Parameterized { raw, args } => {
                write!(f, "{raw}<")?;
                write_list(f, args)?;
                f.write_str(">")
            }
            TypeShape::Variable(name) => f.write_str(name),
            TypeShape::Wildcard => f.write_str("_"),
        }
    }
}

/// Parameter and output shapes of a worker method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    params: Vec<TypeShape>,
    output: TypeShape,
}

impl Signature {
    /// Create a signature.
    pub fn new(params: Vec<TypeShape>, output: TypeShape) -> Self {
        Self { params, output }
    }

    /// Parameter shapes, in order.
    pub fn params(&self) -> &[TypeShape] {
        &self.params
    }

    /// The output shape.
    pub fn output(&self) -> &TypeShape {
        &self.output
    }

    /// `true` when both parameter lists have the same arity and the same
    /// types in order.
    pub fn has_equal_params(&self, params: &[TypeShape]) -> bool {
        self.params.len() == params.len() && self.params.iter().zip(params).all(|(a, b)| a == b)
    }
}

/// Render `path(ty, ty, ...)`.
pub fn describe_call(path: &str, params: &[TypeShape]) -> String {
    struct Params<'a>(&'a [TypeShape]);
    impl fmt::Display for Params<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_list(f, self.0)
        }
    }
    format!("{path}({})", Params(params))
}

fn write_list(f: &mut fmt::Formatter<'_>, shapes: &[TypeShape]) -> fmt::Result {
    for (i, shape) in shapes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{shape}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_compare_by_type_id() {
        assert_eq!(TypeTag::of::<String>(), TypeTag::of::<String>());
        assert_ne!(TypeTag::of::<String>(), TypeTag::of::<&'static str>());
    }

    #[test]
    fn unresolvable_types_are_found_when_nested() {
        assert!(!TypeShape::of::<bool>().has_unresolvable_type());
        assert!(TypeShape::Wildcard.has_unresolvable_type());

        let nested = TypeShape::parameterized(
            "CallHandle",
            vec![TypeShape::parameterized("Vec", vec![TypeShape::Variable("T")])],
        );
        assert!(nested.has_unresolvable_type());

        let resolved = TypeShape::parameterized("CallHandle", vec![TypeShape::of::<bool>()]);
        assert!(!resolved.has_unresolvable_type());
    }

    #[test]
    fn params_must_match_in_order() {
        let sig = Signature::new(
            vec![TypeShape::of::<String>(), TypeShape::of::<i32>()],
            TypeShape::of::<bool>(),
        );
        assert!(sig.has_equal_params(&[TypeShape::of::<String>(), TypeShape::of::<i32>()]));
        assert!(!sig.has_equal_params(&[TypeShape::of::<i32>(), TypeShape::of::<String>()]));
        assert!(!sig.has_equal_params(&[TypeShape::of::<String>()]));
    }

    #[test]
    fn describe_call_lists_params() {
        let text = describe_call(
            "sdk::Offer::pickup_stones",
            &[TypeShape::of::<i32>(), TypeShape::of::<u8>()],
        );
        assert_eq!(text, "sdk::Offer::pickup_stones(i32, u8)");
    }
}
