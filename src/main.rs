//! event-relay demo entry point.
//!
//! Builds a registry from the environment, wires a small clock bus with a
//! chained publish and a faulty listener, and logs what happens.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use tracing_subscriber::EnvFilter;

use event_relay::{BusConfig, DevToolHooks, EventBusRegistry, RegistryConfig};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RegistryConfig::from_env();
    tracing::info!(?config, "starting event-relay demo");

    let registry = EventBusRegistry::with_config(config);
    registry.set_devtools(DevToolHooks::new().on_listener_error(|failure| {
        tracing::error!(
            bus = %failure.event.bus_name,
            event = %failure.event.event_name,
            listener = %failure.listener_id,
            reason = %failure.reason,
            "listener error reported"
        );
    }));

    let clock = registry.create(BusConfig::named("clock").with_immutability(true))?;
    let tick = clock.register_event("tick")?;
    clock.register_event("alarm")?;
    clock.lock();

    // Every third tick raises an alarm; it is delivered after the tick completes.
    let ticks = Arc::new(AtomicU64::new(0));
    let ticks_in = Arc::clone(&ticks);
    let clock_in = clock.downgrade();
    clock.subscribe(
        move |event| {
            let n = ticks_in.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(n, data = %event.data.get(), "tick");
            if n % 3 == 0
                && let Some(clock) = clock_in.upgrade()
            {
                clock.publish("alarm", json!({ "after_ticks": n }));
            }
            Ok(())
        },
        &["tick"],
    )?;

    clock.subscribe(
        |event| {
            event.data.update(|v| {
                v.as_object_mut()
                    .map(|obj| obj.insert("acknowledged".to_string(), json!(true)))
            })?;
            Ok(())
        },
        &["alarm"],
    )?;

    let Some(on_alarm) = clock.accessors("alarm") else {
        anyhow::bail!("alarm accessors missing");
    };
    tracing::info!(
        subscribe = %on_alarm.subscribe_name,
        publish = %on_alarm.publish_name,
        "alarm accessors"
    );
    on_alarm.subscribe(|event| {
        tracing::warn!(data = %event.data.get(), "alarm");
        Ok(())
    })?;

    for second in 0..6 {
        tick.publish(json!({ "second": second }));
    }

    tracing::info!(
        buses = ?registry.names(),
        ticks = ticks.load(Ordering::SeqCst),
        listeners = clock.listener_count(),
        "demo finished"
    );

    Ok(())
}
