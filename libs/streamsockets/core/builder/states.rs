/// Type-state markers for the builder pattern
///
/// These types track at compile time whether the URL source and the router
/// have been set, so an incomplete manager cannot be built.

/// Marker trait for URL source state
pub trait SourceState {}

/// URL source has not been set
pub struct NoSource;
impl SourceState for NoSource {}

/// URL source has been set
pub struct HasSource;
impl SourceState for HasSource {}

/// Marker trait for router state
///
/// Implemented by [`NoRouter`] and by `RoutingBuilder<R>`, which carries the
/// router and its handlers.
pub trait RouterState {}

/// Router has not been set
pub struct NoRouter;
impl RouterState for NoRouter {}
