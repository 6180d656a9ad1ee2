//! Component lifecycle example
//!
//! Builds a small ownership graph (a connection pool owning connections and a
//! child component for its metrics subscription), releases it from several
//! threads at once, and shows that every resource is released exactly once.
//!
//! Run with `RUST_LOG=teardown=debug` to see the release sequence.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use teardown::config::Label;
use teardown::prelude::*;
use tracing_subscriber::EnvFilter;

/// A pretend network connection.
struct Connection {
    id: usize,
    open: AtomicBool,
    closed: Arc<AtomicUsize>,
}

impl Release for Connection {
    fn release(&self) -> ReleaseResult<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.closed.fetch_add(1, Ordering::SeqCst);
            println!("closed connection {}", self.id);
        }
        Ok(())
    }
}

/// Pool state; the hooks flush statistics around teardown.
#[derive(Default)]
struct Pool {
    served: AtomicUsize,
}

impl TeardownHooks for Pool {
    fn before_release(&self, component: &Component<Self>) -> ReleaseResult<()> {
        println!(
            "draining pool with {} connections",
            component.owned_count()
        );
        Ok(())
    }

    fn after_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        println!("pool served {} requests", self.served.load(Ordering::SeqCst));
        Ok(())
    }
}

fn main() -> ReleaseResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let closed = Arc::new(AtomicUsize::new(0));
    let pool = Arc::new(
        Component::builder()
            .label(Label::try_new("connection-pool").expect("valid label"))
            .hooks(Pool::default())
            .build(),
    );

    for id in 0..4 {
        pool.register_for_release(Connection {
            id,
            open: AtomicBool::new(true),
            closed: Arc::clone(&closed),
        })?;
    }

    let metrics = Arc::new(Component::new());
    metrics.register_for_release(ReleaseAction::new(|| {
        println!("unsubscribed from metrics feed");
        Ok(())
    }))?;
    pool.register_handle(ResourceHandle::from(Arc::clone(&metrics)))?;

    pool.on_releasing(|p| {
        println!("releasing (released = {})", p.is_released());
        Ok(())
    });
    pool.on_released(|p| {
        println!("released (released = {})", p.is_released());
        Ok(())
    });

    for _ in 0..10 {
        let served = pool.write_if_active(|state| state.served.fetch_add(1, Ordering::SeqCst));
        assert!(served.is_some());
    }

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.release())
        })
        .collect();
    for worker in workers {
        worker.join().expect("release thread panicked")?;
    }

    assert!(pool.is_released());
    assert!(metrics.is_released());
    assert_eq!(closed.load(Ordering::SeqCst), 4);
    assert_eq!(pool.write_if_active(|_| ()), None);

    // Registering into a released component releases immediately.
    pool.register_for_release(ReleaseAction::new(|| {
        println!("late registration released immediately");
        Ok(())
    }))?;

    println!("all resources released exactly once");
    Ok(())
}
