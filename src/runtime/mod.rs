mod manual;

pub use manual::ManualScheduler;

use futures::future::LocalBoxFuture;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

/// Timers and task spawning for a single-threaded event loop.
///
/// Scheduling a new timer never cancels an old one; callers that debounce
/// cancel the previous handle themselves.
pub trait Scheduler {
    fn now_ms(&self) -> i64;
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
}

/// `setTimeout` timers and Leptos' local task spawner.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Default)]
pub struct BrowserScheduler;

#[cfg(target_arch = "wasm32")]
impl Scheduler for BrowserScheduler {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now().round() as i64
    }

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle {
        use wasm_bindgen::JsCast;

        let Some(win) = web_sys::window() else {
            tracing::warn!("no window; timer dropped");
            return TimerHandle(0);
        };

        let cb = wasm_bindgen::closure::Closure::once_into_js(move || task());
        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                delay_ms.min(i32::MAX as u32) as i32,
            )
            .unwrap_or(0);
        TimerHandle(tid as u64)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(win) = web_sys::window() {
            let _ = win.clear_timeout_with_handle(handle.0 as i32);
        }
    }

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        leptos::task::spawn_local(fut);
    }
}
