//! Type-erased argument and result values.
//!
//! Intercepted operations take and return [`Value`]s. A `Value` is a
//! reference-counted handle: cloning it shares the same object, so a
//! handler that mutates a value through interior mutability (a
//! `Mutex<Vec<_>>`, an atomic, ...) is observed by every other holder.

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

/// Anything that can travel through an interception chain.
///
/// Implemented for every `'static + Send + Sync + Debug` type. The
/// `Debug` bound lets trace advice print result snapshots.
pub trait Payload: Any + Send + Sync + fmt::Debug {
    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + fmt::Debug> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared, type-erased value.
///
/// # Example
///
/// ```
/// use parking_lot::Mutex;
/// use std::sync::Arc;
/// use weft_types::Value;
///
/// let names = Arc::new(Mutex::new(vec!["madhu".to_string()]));
/// let value = Value::from_arc(Arc::clone(&names));
///
/// if let Some(list) = value.downcast_ref::<Mutex<Vec<String>>>() {
///     list.lock()[0].make_ascii_uppercase();
/// }
/// assert_eq!(names.lock()[0], "MADHU");
/// ```
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Payload>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Payload>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    /// Wraps an existing `Arc` without copying, keeping the allocation shared
    /// with the caller.
    #[must_use]
    pub fn from_arc<T: Payload>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: any::type_name::<T>(),
        }
    }

    /// The unit value, returned by operations with nothing to return.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Returns a reference to the inner value if it is of type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        Payload::as_any(&*self.inner).downcast_ref::<T>()
    }

    /// Returns `true` if the inner value is of type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        Payload::as_any(&*self.inner).is::<T>()
    }

    /// Returns the inner value cloned out, if it is of type `T`.
    #[must_use]
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Rust type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if both handles share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}
