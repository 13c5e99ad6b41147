//! Hardware event dispatch.
//!
//! Each event is applied to the service state under the lock, which also
//! snapshots the requests it targets. Handlers run after the lock is dropped.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{LocationOutcome, LocationService};
use crate::authorization::AuthorizationTransition;
use crate::error::LocationError;
use crate::hardware::{HardwareError, HardwareEvent, HardwareEventReceiver};
use crate::model::{AuthorizationStatus, Heading, Position, Visit};
use crate::request::Request;

impl LocationService {
    /// Apply one hardware event and deliver it to the affected requests.
    pub fn handle_event(&self, event: HardwareEvent) {
        self.metrics.hardware_event();
        match event {
            HardwareEvent::PositionsUpdated(batch) => self.on_positions(batch),
            HardwareEvent::PositionFailed(error) => self.on_position_failure(error),
            HardwareEvent::Paused => self.on_paused(),
            HardwareEvent::HeadingUpdated(heading) => self.on_heading(heading),
            HardwareEvent::VisitRecorded(visit) => self.on_visit(visit),
            HardwareEvent::AuthorizationChanged(status) => self.on_authorization(status),
        }
    }

    /// Pump hardware events into [`handle_event`](Self::handle_event) until
    /// every sender is dropped.
    pub fn spawn_event_loop(self: &Arc<Self>, mut events: HardwareEventReceiver) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                service.handle_event(event);
            }
            debug!("Hardware event channel closed");
        })
    }

    fn on_positions(&self, batch: Vec<Position>) {
        let batch_len = batch.len();
        let Some(latest) = batch.into_iter().max_by_key(|position| position.timestamp) else {
            return;
        };
        trace!(batch = batch_len, coordinate = %latest.coordinate, "Positions updated");

        let (targets, outcome) = {
            let mut state = self.state.lock();
            state.last_location = Some(latest.clone());
            let targets = state.locations.enabled_snapshot();

            let mut finished = false;
            for request in targets.iter().filter(|r| r.options().is_one_shot()) {
                state.locations.remove(request.id());
                finished = true;
            }
            let outcome = if finished {
                match self.reconcile_locations(&mut state) {
                    Ok(outcome) => Some(outcome),
                    Err(error) => {
                        warn!(error = %error, "Reconciliation after one-shot delivery failed");
                        None
                    }
                }
            } else {
                None
            };
            (targets, outcome)
        };

        for request in &targets {
            if request.deliver(&latest) {
                self.metrics.position_delivered();
            }
        }
        if let Some(outcome) = outcome {
            self.settle(outcome);
        }
    }

    fn on_position_failure(&self, error: HardwareError) {
        warn!(code = error.code, message = %error.message, "Location hardware failure");
        let teardown = {
            let mut state = self.state.lock();
            self.tear_down_locations(&mut state, LocationError::HardwareFailure(error))
        };
        self.fail_all(teardown);
    }

    fn on_paused(&self) {
        debug!("Location updates paused by hardware");
        let targets = self.state.lock().locations.snapshot();
        for request in &targets {
            request.notify_paused();
        }
    }

    fn on_heading(&self, heading: Heading) {
        let targets = {
            let mut state = self.state.lock();
            state.last_heading = Some(heading.clone());
            state.headings.enabled_snapshot()
        };
        for request in &targets {
            if request.deliver(&heading) {
                self.metrics.heading_delivered();
            }
        }
    }

    fn on_visit(&self, visit: Visit) {
        debug!(coordinate = %visit.coordinate, ongoing = visit.is_ongoing(), "Visit recorded");
        let targets = self.state.lock().visits.snapshot();
        for request in &targets {
            request.deliver(&visit);
            self.metrics.visit_delivered();
        }
    }

    fn on_authorization(&self, status: AuthorizationStatus) {
        let outcome = {
            let mut state = self.state.lock();
            let transition = state.gate.on_status_changed(status);
            self.sync_background(&mut state);
            match transition {
                AuthorizationTransition::Granted => {
                    info!(%status, "Location access granted, resuming location requests");
                    self.resume_permission_paused(&mut state);
                    match self.reconcile_locations(&mut state) {
                        Ok(outcome) => outcome,
                        Err(error) => {
                            warn!(error = %error, "Reconciliation after grant failed");
                            LocationOutcome::Idle
                        }
                    }
                }
                AuthorizationTransition::Revoked(status) => {
                    info!(%status, "Location access revoked, terminating location requests");
                    LocationOutcome::TornDown(self.tear_down_locations(
                        &mut state,
                        LocationError::AuthorizationDenied(status),
                    ))
                }
                AuthorizationTransition::Unchanged => {
                    debug!(%status, "Authorization change needs no action");
                    LocationOutcome::Idle
                }
            }
        };
        self.settle(outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::authorization::GateState;
    use crate::config::ServiceConfig;
    use crate::hardware::testing::{HardwareCall, RecordingHardware};
    use crate::hardware::{event_channel, LocationHardware};
    use crate::model::{AuthorizationIntent, Coordinate, PermissionLevel, UpdateFrequency};
    use crate::request::{LocationOptions, RequestKind};

    fn service(hardware: &Arc<RecordingHardware>) -> LocationService {
        LocationService::new(
            Arc::clone(hardware) as Arc<dyn LocationHardware>,
            ServiceConfig::new(AuthorizationIntent::WhenInUse),
        )
    }

    fn fix(lat: f64, seconds_ago: i64) -> Position {
        Position::at(
            Coordinate::new(lat, 0.0),
            10.0,
            Utc::now() - Duration::seconds(seconds_ago),
        )
    }

    #[test]
    fn test_latest_fix_in_batch_is_delivered() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        service
            .start_location_updates(
                LocationOptions::new(),
                move |p| sink.lock().push(p.coordinate.latitude),
                |_| {},
            )
            .unwrap();

        service.handle_event(HardwareEvent::PositionsUpdated(vec![
            fix(1.0, 30),
            fix(3.0, 0),
            fix(2.0, 10),
        ]));

        assert_eq!(*received.lock(), vec![3.0]);
        assert_eq!(service.last_location().unwrap().coordinate.latitude, 3.0);
        assert_eq!(service.metrics().snapshot().positions_delivered, 1);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);

        service.handle_event(HardwareEvent::PositionsUpdated(Vec::new()));
        assert!(service.last_location().is_none());
    }

    #[test]
    fn test_last_location_only_from_events() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);

        service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();
        assert!(service.last_location().is_none());
    }

    #[test]
    fn test_one_shot_request_removed_after_delivery() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        service
            .start_location_updates(
                LocationOptions::new().with_frequency(UpdateFrequency::OneShot),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                |_| {},
            )
            .unwrap();

        service.handle_event(HardwareEvent::PositionsUpdated(vec![fix(1.0, 0)]));
        service.handle_event(HardwareEvent::PositionsUpdated(vec![fix(2.0, 0)]));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(service.registered(RequestKind::Location), 0);
        assert!(service.location_config().is_none());
    }

    #[test]
    fn test_failure_terminates_every_location_request() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let errors = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let errors = Arc::clone(&errors);
            let successes = Arc::clone(&successes);
            service
                .start_location_updates(
                    LocationOptions::new(),
                    move |_| {
                        successes.fetch_add(1, Ordering::SeqCst);
                    },
                    move |error| {
                        assert!(matches!(error, LocationError::HardwareFailure(_)));
                        errors.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .unwrap();
        }

        service.handle_event(HardwareEvent::PositionFailed(HardwareError::new(
            0,
            "location unknown",
        )));
        service.handle_event(HardwareEvent::PositionsUpdated(vec![fix(1.0, 0)]));

        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert_eq!(successes.load(Ordering::SeqCst), 0);
        assert_eq!(service.registered(RequestKind::Location), 0);
        assert_eq!(hardware.calls().last(), Some(&HardwareCall::StopSignificant));
    }

    #[test]
    fn test_pause_event_reports_each_requests_own_fix() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let request = Arc::new(
            crate::request::LocationRequest::new(LocationOptions::new(), |_| {}, |_| {})
                .on_pause(move |last| sink.lock().push(last.map(|p| p.coordinate.latitude))),
        );
        service.add_location_request(Arc::clone(&request)).unwrap();

        service.handle_event(HardwareEvent::Paused);
        service.handle_event(HardwareEvent::PositionsUpdated(vec![fix(7.0, 0)]));
        service.handle_event(HardwareEvent::Paused);

        assert_eq!(*seen.lock(), vec![None, Some(7.0)]);
        assert_eq!(service.registered(RequestKind::Location), 1);
    }

    #[test]
    fn test_heading_delivery_skips_paused() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let active = service.start_heading_updates(
            None,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );
        let counter = Arc::clone(&count);
        let paused = service.start_heading_updates(
            Some(10.0),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );
        service.pause(paused.id()).unwrap();

        service.handle_event(HardwareEvent::HeadingUpdated(Heading::new(90.0, 5.0)));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(active.last_heading().unwrap().magnetic, 90.0);
        assert!(paused.last_heading().is_none());
        assert_eq!(service.last_heading().unwrap().magnetic, 90.0);
    }

    #[test]
    fn test_visit_delivered_to_every_registered_request() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&count);
            service.start_visit_monitoring(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        service.handle_event(HardwareEvent::VisitRecorded(Visit::new(
            Coordinate::new(1.0, 1.0),
            30.0,
        )));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_grant_resumes_and_applies() {
        let hardware = Arc::new(RecordingHardware::with_status(
            AuthorizationStatus::NotDetermined,
        ));
        let service = service(&hardware);

        let request = service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();
        assert!(request.flags().is_paused());

        hardware.set_status(AuthorizationStatus::AuthorizedWhenInUse);
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedWhenInUse,
        ));

        assert!(request.is_active());
        assert!(service.location_config().is_some());
    }

    #[test]
    fn test_grant_event_wins_over_lagging_status_reading() {
        let hardware = Arc::new(RecordingHardware::with_status(
            AuthorizationStatus::NotDetermined,
        ));
        let service = service(&hardware);

        let request = service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();

        // The getter keeps reporting NotDetermined after the grant event.
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedWhenInUse,
        ));

        assert!(request.is_active());
        assert!(service.location_config().is_some());
        assert_eq!(service.authorization_state(), GateState::GrantedWhenInUse);
        assert_eq!(
            hardware.count(&HardwareCall::RequestPermission(PermissionLevel::WhenInUse)),
            1
        );
    }

    #[test]
    fn test_background_delivery_follows_granted_level() {
        let hardware = Arc::new(RecordingHardware::with_status(
            AuthorizationStatus::NotDetermined,
        ));
        let service = LocationService::new(
            Arc::clone(&hardware) as Arc<dyn LocationHardware>,
            ServiceConfig::new(AuthorizationIntent::Always).with_background_updates(true),
        );
        service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();
        assert_eq!(hardware.count(&HardwareCall::BackgroundUpdates(true)), 1);

        hardware.set_status(AuthorizationStatus::AuthorizedWhenInUse);
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedWhenInUse,
        ));

        let calls = hardware.calls();
        let cleared = calls
            .iter()
            .position(|c| *c == HardwareCall::BackgroundUpdates(false))
            .expect("background delivery cleared");
        let started = calls
            .iter()
            .position(|c| matches!(c, HardwareCall::StartUpdates(_)))
            .expect("updates started");
        assert!(cleared < started);
        assert!(!service.location_config().unwrap().allows_background_updates);

        hardware.set_status(AuthorizationStatus::AuthorizedAlways);
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedAlways,
        ));
        assert_eq!(hardware.count(&HardwareCall::BackgroundUpdates(true)), 2);
        assert!(service.location_config().unwrap().allows_background_updates);

        hardware.set_status(AuthorizationStatus::Denied);
        service.handle_event(HardwareEvent::AuthorizationChanged(AuthorizationStatus::Denied));
        assert_eq!(hardware.count(&HardwareCall::BackgroundUpdates(false)), 2);
    }

    #[test]
    fn test_caller_pause_during_prompt_survives_grant() {
        let hardware = Arc::new(RecordingHardware::with_status(
            AuthorizationStatus::NotDetermined,
        ));
        let service = service(&hardware);

        let held = service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();
        let other = service
            .start_location_updates(LocationOptions::new(), |_| {}, |_| {})
            .unwrap();
        assert!(other.flags().is_paused());
        service.pause(held.id()).unwrap();

        hardware.set_status(AuthorizationStatus::AuthorizedWhenInUse);
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedWhenInUse,
        ));

        assert!(held.flags().is_paused());
        assert!(other.is_active());
        assert!(service.location_config().is_some());

        service.resume(held.id()).unwrap();
        assert!(held.is_active());
    }

    #[test]
    fn test_denial_delivers_error_exactly_once() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = service(&hardware);
        let errors = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let errors = Arc::clone(&errors);
            service
                .start_location_updates(
                    LocationOptions::new(),
                    |_| {},
                    move |error| {
                        assert_eq!(
                            *error,
                            LocationError::AuthorizationDenied(AuthorizationStatus::Denied)
                        );
                        errors.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .unwrap();
        }
        service.handle_event(HardwareEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedWhenInUse,
        ));

        hardware.set_status(AuthorizationStatus::Denied);
        service.handle_event(HardwareEvent::AuthorizationChanged(AuthorizationStatus::Denied));
        service.handle_event(HardwareEvent::AuthorizationChanged(AuthorizationStatus::Denied));

        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert_eq!(service.registered(RequestKind::Location), 0);
    }

    #[test]
    fn test_handlers_may_reenter_service() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = Arc::new(service(&hardware));
        let weak = Arc::downgrade(&service);

        service
            .start_location_updates(
                LocationOptions::new(),
                move |_| {
                    if let Some(service) = weak.upgrade() {
                        service.start_heading_updates(None, |_| {}, |_| {});
                    }
                },
                |_| {},
            )
            .unwrap();

        service.handle_event(HardwareEvent::PositionsUpdated(vec![fix(1.0, 0)]));
        assert_eq!(service.registered(RequestKind::Heading), 1);
    }

    #[tokio::test]
    async fn test_event_loop_pumps_channel() {
        let hardware = Arc::new(RecordingHardware::authorized());
        let service = Arc::new(service(&hardware));
        let (tx, rx) = event_channel();
        let handle = service.spawn_event_loop(rx);

        tx.send(HardwareEvent::HeadingUpdated(Heading::new(45.0, 1.0)))
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(service.last_heading().unwrap().magnetic, 45.0);
        assert_eq!(service.metrics().snapshot().hardware_events, 1);
    }
}
