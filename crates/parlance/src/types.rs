//! Value types and type-erased values.
//!
//! Readers are looked up by [`ValueType`], a runtime descriptor for a Rust
//! type. Rust has no subtyping, so assignability is declared explicitly: a
//! `ValueType` carries the list of supertypes it may be read as, nearest first.
//!
//! ```rust,ignore
//! let entity = ValueType::of::<Entity>();
//! let player = ValueType::of::<Player>().extends(entity.clone());
//!
//! assert!(player.is_assignable_to(&entity));
//! ```
//!
//! Enums that should parse from their constant names implement
//! [`CommandEnum`] and are described with [`ValueType::enumeration`].

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::reader::EnumMetadata;

/// A bound argument value.
///
/// Values are cheap to clone (reference counted) so cached enum constants and
/// parsed parameters can be shared.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a concrete value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Returns a reference to the value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Name of the concrete type stored in this value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A fieldless enum whose constants can be named on the command line.
///
/// Implement by hand or with [`command_enum!`](crate::command_enum).
pub trait CommandEnum: Clone + Send + Sync + 'static {
    /// All constants, in declaration order.
    fn variants() -> &'static [Self];

    /// The constant name as declared, e.g. `"CC_DD"`.
    fn constant_name(&self) -> &'static str;

    /// Human-readable name of the enum type, used in error messages.
    fn display_name() -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// Builds enum metadata by enumerating the constants once.
pub(crate) type EnumProbe = fn() -> EnumMetadata;

fn probe<E: CommandEnum>() -> EnumMetadata {
    EnumMetadata::new(
        E::display_name(),
        E::variants()
            .iter()
            .map(|v| (v.constant_name(), Value::new(v.clone()))),
    )
}

/// Runtime descriptor of a readable type.
#[derive(Clone)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
    supertypes: Arc<[ValueType]>,
    enumeration: Option<EnumProbe>,
}

impl ValueType {
    /// Describes `T` with no declared supertypes.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            supertypes: Arc::from(Vec::new()),
            enumeration: None,
        }
    }

    /// Describes an enum that falls back to the generic enum reader.
    pub fn enumeration<E: CommandEnum>() -> Self {
        Self {
            enumeration: Some(probe::<E> as EnumProbe),
            ..Self::of::<E>()
        }
    }

    /// Declares that this type can be read as `parent`.
    ///
    /// The parent's own supertypes are inherited after it, so the list stays
    /// ordered nearest first.
    pub fn extends(mut self, parent: ValueType) -> Self {
        let mut supers: Vec<ValueType> = self.supertypes.iter().cloned().collect();
        let inherited: Vec<ValueType> = parent.supertypes.iter().cloned().collect();
        for candidate in std::iter::once(parent).chain(inherited) {
            if candidate.id != self.id && !supers.iter().any(|s| s.id == candidate.id) {
                supers.push(candidate);
            }
        }
        self.supertypes = Arc::from(supers);
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// Declared supertypes, nearest first.
    pub fn supertypes(&self) -> &[ValueType] {
        &self.supertypes
    }

    pub fn is_enum(&self) -> bool {
        self.enumeration.is_some()
    }

    pub(crate) fn enum_probe(&self) -> Option<EnumProbe> {
        self.enumeration
    }

    /// True when a value of this type may be read by a reader for `other`.
    pub fn is_assignable_to(&self, other: &ValueType) -> bool {
        self.id == other.id || self.supertypes.iter().any(|s| s.id == other.id)
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueType")
            .field("name", &self.name)
            .field(
                "supertypes",
                &self.supertypes.iter().map(|s| s.name).collect::<Vec<_>>(),
            )
            .field("enum", &self.is_enum())
            .finish()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    // Generic arguments may contain paths of their own; only trim the outer one.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Implements [`CommandEnum`] for a fieldless enum.
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Mode { Fast, Slow }
///
/// parlance::command_enum!(Mode { Fast => "FAST", Slow => "SLOW" });
/// ```
#[macro_export]
macro_rules! command_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::CommandEnum for $ty {
            fn variants() -> &'static [Self] {
                &[$($ty::$variant),+]
            }

            fn constant_name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entity;
    struct Living;
    struct Player;

    #[test]
    fn value_downcasts_to_stored_type() {
        let v = Value::new(42i64);
        assert!(v.is::<i64>());
        assert_eq!(v.downcast_ref::<i64>(), Some(&42));
        assert!(v.downcast_ref::<String>().is_none());
    }

    #[test]
    fn supertypes_are_inherited_nearest_first() {
        let entity = ValueType::of::<Entity>();
        let living = ValueType::of::<Living>().extends(entity.clone());
        let player = ValueType::of::<Player>().extends(living.clone());

        let names: Vec<_> = player.supertypes().iter().map(|t| t.short_name()).collect();
        assert_eq!(names, vec!["Living", "Entity"]);
        assert!(player.is_assignable_to(&entity));
        assert!(player.is_assignable_to(&player));
        assert!(!entity.is_assignable_to(&player));
    }

    #[test]
    fn extends_ignores_duplicates_and_self() {
        let entity = ValueType::of::<Entity>();
        let player = ValueType::of::<Player>()
            .extends(entity.clone())
            .extends(entity)
            .extends(ValueType::of::<Player>());
        assert_eq!(player.supertypes().len(), 1);
    }

    #[test]
    fn short_name_strips_module_path() {
        assert_eq!(ValueType::of::<Entity>().short_name(), "Entity");
        assert_eq!(ValueType::of::<i64>().short_name(), "i64");
    }

    #[test]
    fn equality_is_by_type_identity() {
        let plain = ValueType::of::<Entity>();
        let extended = ValueType::of::<Entity>().extends(ValueType::of::<Living>());
        assert_eq!(plain, extended);
    }
}
