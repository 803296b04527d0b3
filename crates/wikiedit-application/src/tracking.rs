/// Emits an analytics event as a `tracing` event on the tracking target.
macro_rules! track {
    ($event:expr) => {
        ::tracing::info!(target: ::wikiedit_core::TRACK_TARGET, event = %$event, "track")
    };
    ($event:expr, $($field:tt)+) => {
        ::tracing::info!(target: ::wikiedit_core::TRACK_TARGET, event = %$event, $($field)+, "track")
    };
}
