use std::rc::Rc;

use multicast_delegate::{MulticastDelegate, Retention};
use tracing::info;
use tracing_subscriber::EnvFilter;

trait OrderObserver {
    fn order_shipped(&self, order_id: u64);
}

struct Dashboard;

impl OrderObserver for Dashboard {
    fn order_shipped(&self, order_id: u64) {
        info!(order_id, "dashboard updated");
    }
}

struct AuditLog;

impl OrderObserver for AuditLog {
    fn order_shipped(&self, order_id: u64) {
        info!(order_id, "audit entry written");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .init();

    // Weakly held observers: dropping one unregisters it automatically.
    let observers: MulticastDelegate<dyn OrderObserver> = MulticastDelegate::new();

    let dashboard: Rc<dyn OrderObserver> = Rc::new(Dashboard);
    observers.add(dashboard.clone());
    {
        let audit: Rc<dyn OrderObserver> = Rc::new(AuditLog);
        observers.add(audit.clone());

        observers.invoke(|observer| observer.order_shipped(1001));
    }

    // The audit log went out of scope; only the dashboard hears this one.
    observers.invoke(|observer| observer.order_shipped(1002));

    // Strongly held observers survive without an external owner.
    let retained: MulticastDelegate<dyn OrderObserver> =
        MulticastDelegate::with_retention(Retention::Strong);
    retained.add(Rc::new(AuditLog));
    retained.invoke(|observer| observer.order_shipped(1003));
}
