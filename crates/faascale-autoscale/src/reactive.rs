//! Reactive scaler — one load → replicas decision per tick.
//!
//! Scale-up is applied in the same tick. Scale-down is handed to the
//! [`Debounce`] and only applied if it still holds once the decreasing
//! duration has elapsed, re-sampled fresh at that point.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use faascale_core::{FunctionKey, GatewayClient, MetricsClient, ReplicaSnapshot, ScaleResult};

use crate::debounce::{CancelOutcome, Debounce};
use crate::policy::compute_target;
use crate::queries;

/// Outcome of a single scaling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Replicas were set to this count.
    ScaleTo(u32),
    /// Target equals the current count; nothing written.
    NoChange,
    /// A shrink to this count was armed behind the debounce timer.
    ScaleDownArmed(u32),
    /// A shrink is already being debounced.
    ScaleDownPending,
}

/// Reactive scaling state of one function.
pub struct ReactiveScaler {
    function: FunctionKey,
    gateway: Arc<dyn GatewayClient>,
    metrics: Arc<dyn MetricsClient>,
    decreasing_duration: Duration,
    debounce: Debounce,
}

impl ReactiveScaler {
    pub fn new(
        function: FunctionKey,
        gateway: Arc<dyn GatewayClient>,
        metrics: Arc<dyn MetricsClient>,
        decreasing_duration: Duration,
    ) -> Self {
        Self {
            function,
            gateway,
            metrics,
            decreasing_duration,
            debounce: Debounce::new(),
        }
    }

    pub fn function(&self) -> &FunctionKey {
        &self.function
    }

    pub fn debounce(&self) -> &Debounce {
        &self.debounce
    }

    /// Run one decision cycle.
    ///
    /// A failed metrics fetch or replica read aborts the tick with state
    /// unchanged.
    pub async fn tick(&mut self) -> ScaleResult<ScaleDecision> {
        let (load, snapshot) =
            sample_load(self.metrics.as_ref(), self.gateway.as_ref(), &self.function).await?;
        let target = compute_target(
            load,
            snapshot.target_load,
            snapshot.min_replicas,
            snapshot.max_replicas,
        );

        if target >= snapshot.replicas {
            let current = match self.debounce.hold().await {
                CancelOutcome::Idle => snapshot.replicas,
                CancelOutcome::Cancelled => {
                    debug!(function = %self.function, "pending scale-down dropped, load recovered");
                    snapshot.replicas
                }
                // The fired timer's write has landed; the snapshot may be stale.
                CancelOutcome::AlreadyFired => {
                    self.gateway
                        .get_replicas(&self.function.name, &self.function.namespace)
                        .await?
                        .replicas
                }
            };
            if target == current {
                return Ok(ScaleDecision::NoChange);
            }

            self.gateway
                .set_replicas(&self.function.name, &self.function.namespace, target)
                .await?;
            info!(
                function = %self.function,
                from = current,
                to = target,
                load,
                "scaled up"
            );
            return Ok(ScaleDecision::ScaleTo(target));
        }

        if !self.debounce.should_arm() {
            debug!(function = %self.function, target, "scale-down already pending");
            return Ok(ScaleDecision::ScaleDownPending);
        }

        let gateway = Arc::clone(&self.gateway);
        let metrics = Arc::clone(&self.metrics);
        let function = self.function.clone();
        self.debounce.arm(self.decreasing_duration, async move {
            confirm_scale_down(gateway.as_ref(), metrics.as_ref(), &function).await;
        });

        info!(
            function = %self.function,
            from = snapshot.replicas,
            to = target,
            after = ?self.decreasing_duration,
            "scale-down armed"
        );
        Ok(ScaleDecision::ScaleDownArmed(target))
    }

    /// Stop any pending scale-down and reset the debounce, waiting out a
    /// write already in flight.
    pub async fn cancel_pending(&mut self) -> CancelOutcome {
        self.debounce.hold().await
    }

    /// Stop the pending scale-down and wait out a write already in flight.
    pub async fn shutdown(&mut self) {
        self.debounce.shutdown().await;
    }
}

/// Fetch the in-flight load and the replica snapshot of a function.
async fn sample_load(
    metrics: &dyn MetricsClient,
    gateway: &dyn GatewayClient,
    function: &FunctionKey,
) -> ScaleResult<(f64, ReplicaSnapshot)> {
    let load = metrics
        .fetch(&queries::in_flight(&function.name, &function.namespace))
        .await?
        .value;
    let snapshot = gateway
        .get_replicas(&function.name, &function.namespace)
        .await?;

    if snapshot.available_replicas > 0 {
        debug!(
            %function,
            load,
            available = snapshot.available_replicas,
            average = load / f64::from(snapshot.available_replicas),
            "in-flight load"
        );
    } else {
        debug!(%function, load, "in-flight load, no replicas available");
    }
    Ok((load, snapshot))
}

/// Body of a debounce timer that elapsed: re-sample and apply the shrink.
async fn confirm_scale_down(
    gateway: &dyn GatewayClient,
    metrics: &dyn MetricsClient,
    function: &FunctionKey,
) {
    let (load, snapshot) = match sample_load(metrics, gateway, function).await {
        Ok(sampled) => sampled,
        Err(e) => {
            warn!(%function, error = %e, "scale-down timer fired but sampling failed");
            return;
        }
    };
    let target = compute_target(
        load,
        snapshot.target_load,
        snapshot.min_replicas,
        snapshot.max_replicas,
    );

    match gateway
        .set_replicas(&function.name, &function.namespace, target)
        .await
    {
        Ok(()) => info!(%function, from = snapshot.replicas, to = target, load, "scaled down"),
        Err(e) => error!(%function, to = target, error = %e, "scale-down write failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGateway, FakeMetrics, snapshot};

    const FN: &str = "figlet";
    const NS: &str = "openfaas-fn";

    fn scaler(gateway: &Arc<FakeGateway>, metrics: &Arc<FakeMetrics>) -> ReactiveScaler {
        ReactiveScaler::new(
            FunctionKey::new(FN, NS),
            gateway.clone(),
            metrics.clone(),
            Duration::from_secs(2),
        )
    }

    fn set_load(metrics: &FakeMetrics, load: f64) {
        metrics.set(&queries::in_flight(FN, NS), load);
    }

    async fn tick_after(s: &mut ReactiveScaler, wait: Duration) -> ScaleDecision {
        tokio::time::sleep(wait).await;
        s.tick().await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_suppresses_until_timer_fires() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);
        let tick = Duration::from_secs(1);

        // Steady: 20 / 5 = 4 replicas.
        set_load(&metrics, 20.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::NoChange);

        // Load drops: arm once, then keep debouncing.
        set_load(&metrics, 4.0);
        assert_eq!(tick_after(&mut s, tick).await, ScaleDecision::ScaleDownArmed(1));
        assert_eq!(tick_after(&mut s, tick).await, ScaleDecision::ScaleDownPending);
        assert!(gateway.writes().is_empty());

        // Timer elapses two ticks after arming.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(gateway.writes(), vec![(FN.to_string(), 1)]);
        assert!(s.debounce().last_trigger_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_cancelled_when_load_recovers() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);
        let tick = Duration::from_secs(1);

        set_load(&metrics, 20.0);
        s.tick().await.unwrap();
        set_load(&metrics, 4.0);
        assert_eq!(tick_after(&mut s, tick).await, ScaleDecision::ScaleDownArmed(1));

        set_load(&metrics, 20.0);
        assert_eq!(tick_after(&mut s, tick).await, ScaleDecision::NoChange);
        assert!(!s.debounce().is_armed());
        assert!(s.debounce().non_decreasing());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(gateway.writes().is_empty());
        // Only the three ticks sampled load; the timer never did.
        assert_eq!(metrics.calls(&queries::in_flight(FN, NS)), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_up_is_immediate_and_cancels_pending_shrink() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(2, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 12.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleTo(3));
        assert_eq!(gateway.writes(), vec![(FN.to_string(), 3)]);

        // Arm a shrink, then spike before it fires.
        set_load(&metrics, 1.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));
        set_load(&metrics, 30.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleTo(6));
        assert!(!s.debounce().is_armed());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            gateway.writes(),
            vec![(FN.to_string(), 3), (FN.to_string(), 6)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scale_up_lands_after_fired_shrink_write() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 0.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));

        // The timer fires at 2s and stalls on its replica read until 7s.
        gateway.delay_next_read(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(s.debounce().last_trigger_fired());
        assert!(gateway.writes().is_empty());

        set_load(&metrics, 30.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleTo(6));
        assert_eq!(
            gateway.writes(),
            vec![(FN.to_string(), 1), (FN.to_string(), 6)]
        );
        assert_eq!(gateway.replicas(FN), Some(6));
    }

    #[tokio::test(start_paused = true)]
    async fn fired_shrink_then_steady_load_never_rewrites() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 0.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.replicas(FN), Some(1));

        set_load(&metrics, 5.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::NoChange);
        assert_eq!(gateway.writes(), vec![(FN.to_string(), 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_target_never_writes() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(3, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        for load in [11.0, 15.0, 14.2] {
            set_load(&metrics, load);
            assert_eq!(s.tick().await.unwrap(), ScaleDecision::NoChange);
        }
        assert!(gateway.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fired_timer_resamples_fresh_load() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(8, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 4.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));

        // Load rises, but still below the current count, before the timer fires.
        set_load(&metrics, 12.0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.writes(), vec![(FN.to_string(), 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rearms_after_a_fired_timer() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(8, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 20.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(4));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.replicas(FN), Some(4));

        // A further drop arms again without an intervening steady tick.
        set_load(&metrics, 4.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            gateway.writes(),
            vec![(FN.to_string(), 4), (FN.to_string(), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_aborts_tick_without_state_change() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        // No sample recorded: empty result.
        let err = s.tick().await.unwrap_err();
        assert!(err.is_empty_result());

        set_load(&metrics, 4.0);
        gateway.fail_read(true);
        assert!(s.tick().await.is_err());

        assert!(s.debounce().non_decreasing());
        assert!(!s.debounce().is_armed());
        assert!(gateway.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_is_reported() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(1, 1, 10, 5.0));
        gateway.fail_write(true);
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 50.0);
        let err = s.tick().await.unwrap_err();
        assert!(err.to_string().contains("figlet"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_pending_shrink() {
        let gateway = FakeGateway::new();
        let metrics = FakeMetrics::new();
        gateway.put_snapshot(FN, snapshot(4, 1, 10, 5.0));
        let mut s = scaler(&gateway, &metrics);

        set_load(&metrics, 0.0);
        assert_eq!(s.tick().await.unwrap(), ScaleDecision::ScaleDownArmed(1));
        s.shutdown().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(gateway.writes().is_empty());
    }
}
