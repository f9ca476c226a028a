//! The async primitive: three interchangeable suspend-at-field-boundary
//! strategies (spec.md §4.5).
//!
//! There is no `juniper` analog for this — `juniper` always resolves on
//! whatever executor the caller's own `Future` is polled on. This module is
//! grounded instead on the general shape of `original_source`'s
//! `GraphQLService.cpp`, which offers an `AwaitableScope` selectable per
//! request (immediate / `std::async` / single background thread), translated
//! into a plain `Future` that resolves once execution may proceed — the
//! engine `.await`s it at every field boundary (spec.md §4.3 "suspend on the
//! configured awaitable before invoking the resolver").

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
#[cfg(feature = "queue-launch")]
use std::{
    sync::{mpsc, Arc},
    thread::ThreadId,
};

/// The launch policy chosen for one resolution (spec.md §4.5).
///
/// Immutable for the lifetime of a single resolution: a dispatcher may
/// override what the caller asked for (mutations always force [`Launch::Inline`],
/// spec.md §4.5/§4.7), but once execution starts the policy in effect does
/// not change mid-flight.
#[derive(Clone)]
pub enum Launch {
    /// Never suspends; the continuation runs immediately on whichever task
    /// polls it.
    Inline,
    /// Spawns one detached OS thread per suspension, which resumes the
    /// continuation and then exits.
    ThreadPerTask,
    /// Hands the continuation to a single long-lived worker thread's FIFO.
    /// Gated behind the `queue-launch` feature.
    #[cfg(feature = "queue-launch")]
    Queue(Arc<Queue>),
}

impl Launch {
    /// Suspends according to this policy. The executor calls this once per
    /// field before invoking its resolver, and (depending on
    /// [`crate::resolve`]) once more before materializing the resolver's
    /// result.
    pub async fn suspend(&self) {
        match self {
            Self::Inline => {}
            Self::ThreadPerTask => ThreadPerTaskSuspend { spawned: false }.await,
            #[cfg(feature = "queue-launch")]
            Self::Queue(queue) => queue.suspend().await,
        }
    }
}

/// A `Future` that is immediately pending once, spawns a detached thread to
/// wake its waker, and is ready from then on.
struct ThreadPerTaskSuspend {
    spawned: bool,
}

impl Future for ThreadPerTaskSuspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.spawned {
            return Poll::Ready(());
        }
        self.spawned = true;
        let waker = cx.waker().clone();
        std::thread::spawn(move || waker.wake());
        Poll::Pending
    }
}

#[cfg(feature = "queue-launch")]
type Job = Box<dyn FnOnce() + Send>;

/// A single background worker thread draining a FIFO of resume callbacks
/// (spec.md §4.5 "Queue"). Gated behind the `queue-launch` feature.
#[cfg(feature = "queue-launch")]
pub struct Queue {
    sender: mpsc::Sender<Job>,
    owner_thread: ThreadId,
    worker: std::sync::Mutex<Option<std::thread::JoinHandle<()>>>,
}

#[cfg(feature = "queue-launch")]
impl Queue {
    /// Spawns the worker thread. The thread that calls `new` becomes the
    /// queue's "owner thread": suspending from that thread enqueues work,
    /// suspending from any other thread is a no-op (already ready).
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = std::thread::spawn(move || {
            while let Ok(job) = receiver.recv() {
                job();
            }
        });
        Arc::new(Self {
            sender,
            owner_thread: std::thread::current().id(),
            worker: std::sync::Mutex::new(Some(worker)),
        })
    }

    async fn suspend(self: &Arc<Self>) {
        QueueSuspend {
            queue: Arc::clone(self),
            enqueued: false,
        }
        .await
    }
}

#[cfg(feature = "queue-launch")]
impl Drop for Queue {
    /// Shuts the queue down cleanly: dropping `sender` (there is only this
    /// one, since `Queue` isn't `Clone`) closes the channel, the worker's
    /// `recv` loop exits once drained, and we join it — without enqueuing or
    /// waiting on any further work (spec.md §4.5).
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = handle.join();
        }
    }
}

#[cfg(feature = "queue-launch")]
struct QueueSuspend {
    queue: Arc<Queue>,
    enqueued: bool,
}

#[cfg(feature = "queue-launch")]
impl Future for QueueSuspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if std::thread::current().id() != self.queue.owner_thread {
            return Poll::Ready(());
        }
        if self.enqueued {
            return Poll::Ready(());
        }
        self.enqueued = true;
        let waker = cx.waker().clone();
        // The receiving end only goes away when the `Queue` itself drops,
        // which can't happen while this future still holds an `Arc` to it.
        let _ = self.queue.sender.send(Box::new(move || waker.wake()));
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_never_suspends() {
        Launch::Inline.suspend().await;
    }

    #[tokio::test]
    async fn thread_per_task_resumes() {
        Launch::ThreadPerTask.suspend().await;
    }

    #[cfg(feature = "queue-launch")]
    #[tokio::test]
    async fn queue_resumes_work_enqueued_from_owner_thread() {
        let queue = Queue::new();
        let launch = Launch::Queue(queue);
        launch.suspend().await;
        launch.suspend().await;
    }
}
