//! Typed access to route captures.

use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::inject::{Resolve, ResolveError, Resolver};
use crate::router::RouteInfo;

/// Handler parameter holding typed captures of the matched route.
///
/// `T` is either a single value (the first capture) or a tuple of up to four
/// values taken in declaration order:
///
/// ```rust
/// use strip::dispatcher::Path;
///
/// // GET /user/:uid/posts/:pid
/// fn post(Path((uid, pid)): Path<(u64, String)>) {
///     let _ = (uid, pid);
/// }
/// # let _ = strip::router::get(post);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Values that can be built from the captures of a [`RouteInfo`].
pub trait FromCaptures: Sized {
    /// # Errors
    ///
    /// [`ResolveError::Capture`] on a count mismatch or a parse failure.
    fn from_captures(info: &RouteInfo) -> Result<Self, ResolveError>;
}

fn capture_at<T>(info: &RouteInfo, index: usize) -> Result<T, ResolveError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some((key, raw)) = info.params.get(index) else {
        return Err(ResolveError::Capture {
            key: format!("#{index}"),
            reason: format!("route `{}` has {} captures", info.path, info.params.len()),
        });
    };
    raw.parse::<T>().map_err(|e| ResolveError::Capture {
        key: key.to_string(),
        reason: format!(
            "cannot parse `{raw}` as {}: {e}",
            std::any::type_name::<T>()
        ),
    })
}

macro_rules! impl_from_captures_for_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromCaptures for $ty {
                fn from_captures(info: &RouteInfo) -> Result<Self, ResolveError> {
                    capture_at::<$ty>(info, 0)
                }
            }
        )*
    };
}

impl_from_captures_for_primitive! {
    String, bool, char,
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64,
}

macro_rules! impl_from_captures_for_tuple {
    ($(($ty:ident, $idx:tt)),+) => {
        impl<$($ty),+> FromCaptures for ($($ty,)+)
        where
            $($ty: FromStr, $ty::Err: std::fmt::Display,)+
        {
            fn from_captures(info: &RouteInfo) -> Result<Self, ResolveError> {
                let expected = [$($idx),+].len();
                if info.params.len() != expected {
                    return Err(ResolveError::Capture {
                        key: info.path.to_string(),
                        reason: format!(
                            "expected {expected} captures, found {}",
                            info.params.len()
                        ),
                    });
                }
                Ok(($(capture_at::<$ty>(info, $idx)?,)+))
            }
        }
    };
}

impl_from_captures_for_tuple!((T1, 0));
impl_from_captures_for_tuple!((T1, 0), (T2, 1));
impl_from_captures_for_tuple!((T1, 0), (T2, 1), (T3, 2));
impl_from_captures_for_tuple!((T1, 0), (T2, 1), (T3, 2), (T4, 3));

impl<T: FromCaptures> Resolve for Path<T> {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        let info = resolver
            .try_resolve::<RouteInfo>(None)?
            .ok_or(ResolveError::NoContext {
                type_name: std::any::type_name::<Self>(),
            })?;
        T::from_captures(&info).map(Path)
    }
}

/// The matched route itself, for handlers that want raw captures.
impl Resolve for RouteInfo {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        resolver
            .try_resolve::<RouteInfo>(None)?
            .map(Arc::unwrap_or_clone)
            .ok_or(ResolveError::NoContext {
                type_name: "RouteInfo",
            })
    }
}
