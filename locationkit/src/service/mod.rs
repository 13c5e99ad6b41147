//! Location service: the single owner of the hardware session.
//!
//! [`LocationService`] holds the three observer registries and the
//! authorization gate behind one lock. Every registry mutation reconciles the
//! affected hardware configuration before the lock is released, so the
//! hardware is never configured from a stale snapshot.
//!
//! # Lifecycle
//!
//! ```text
//! caller ──add/stop/pause/resume──► registry ──► reconcile ──► hardware
//!                                                                  │
//! handlers ◄── dispatch (lock released) ◄── handle_event ◄── event channel
//! ```
//!
//! Handlers always run after the lock is released, on a snapshot of the
//! targeted requests. A handler may therefore register, stop or pause
//! requests. Hardware implementations run under the lock and must report back
//! through the event channel only.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use locationkit::config::ServiceConfig;
//! use locationkit::hardware::{HardwareError, LocationHardware};
//! use locationkit::model::*;
//! use locationkit::reconcile::LocationConfig;
//! use locationkit::request::{LocationOptions, Request};
//! use locationkit::service::LocationService;
//!
//! struct NullHardware;
//!
//! impl LocationHardware for NullHardware {
//!     fn authorization_status(&self) -> AuthorizationStatus { AuthorizationStatus::AuthorizedWhenInUse }
//!     fn request_permission(&self, _: PermissionLevel) -> Result<(), HardwareError> { Ok(()) }
//!     fn set_background_updates(&self, _: bool) {}
//!     fn start_updates(&self, _: &LocationConfig) {}
//!     fn stop_updates(&self) {}
//!     fn start_significant_changes(&self) {}
//!     fn stop_significant_changes(&self) {}
//!     fn start_heading(&self, _: HeadingFilter, _: DeviceOrientation) {}
//!     fn stop_heading(&self) {}
//!     fn start_visit_monitoring(&self) {}
//!     fn stop_visit_monitoring(&self) {}
//! }
//!
//! let service = LocationService::new(Arc::new(NullHardware), ServiceConfig::default());
//! let request = service
//!     .start_location_updates(
//!         LocationOptions::new().with_accuracy(Accuracy::House),
//!         |position| println!("{}", position.coordinate),
//!         |error| eprintln!("{}", error),
//!     )
//!     .unwrap();
//!
//! assert_eq!(service.location_config().unwrap().accuracy, Accuracy::House);
//! service.stop(request.id()).unwrap();
//! assert!(service.location_config().is_none());
//! ```

mod dispatch;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::authorization::{AuthorizationGate, GateDecision, GateState};
use crate::config::ServiceConfig;
use crate::error::{LocationError, LocationResult};
use crate::hardware::LocationHardware;
use crate::model::{
    AuthorizationStatus, DeviceOrientation, Heading, HeadingFilter, Position, Visit,
};
use crate::reconcile::{derive_heading_filter, derive_location_config, LocationConfig, MonitoringMode};
use crate::registry::ObserverRegistry;
use crate::request::{
    HeadingRequest, LocationOptions, LocationRequest, Request, RequestId, RequestKind,
    VisitRequest,
};
use crate::telemetry::ServiceMetrics;

/// Mutable service state, guarded by one lock.
struct ServiceState {
    locations: ObserverRegistry<LocationRequest>,
    headings: ObserverRegistry<HeadingRequest>,
    visits: ObserverRegistry<VisitRequest>,
    gate: AuthorizationGate,
    orientation: DeviceOrientation,
    applied_location: Option<LocationConfig>,
    applied_heading: Option<HeadingFilter>,
    visit_monitoring: bool,
    last_location: Option<Position>,
    last_heading: Option<Heading>,
    /// Location requests paused while a permission prompt is in flight.
    permission_paused: Vec<RequestId>,
    /// Background delivery as last set on the hardware.
    background_applied: bool,
}

/// Location requests terminated while the lock was held, failed after it is
/// released.
struct Teardown {
    requests: Vec<Arc<LocationRequest>>,
    error: LocationError,
}

/// Result of a location reconciliation pass.
enum LocationOutcome {
    /// No enabled requests; monitoring stopped.
    Idle,
    /// Hardware configured.
    Applied,
    /// Waiting for a permission answer.
    Deferred,
    /// Access refused or the permission request failed.
    TornDown(Teardown),
}

/// Multiplexes location, heading and visit requests onto one hardware session.
pub struct LocationService {
    hardware: Arc<dyn LocationHardware>,
    config: ServiceConfig,
    state: Mutex<ServiceState>,
    metrics: Arc<ServiceMetrics>,
}

impl LocationService {
    /// Create a service over the given hardware.
    pub fn new(hardware: Arc<dyn LocationHardware>, config: ServiceConfig) -> Self {
        Self::with_metrics(hardware, config, Arc::new(ServiceMetrics::new()))
    }

    /// Create a service that records into shared metrics.
    pub fn with_metrics(
        hardware: Arc<dyn LocationHardware>,
        config: ServiceConfig,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        info!(
            intent = ?config.intent,
            background = config.background_updates,
            "Location service created"
        );
        let state = ServiceState {
            locations: ObserverRegistry::new(),
            headings: ObserverRegistry::new(),
            visits: ObserverRegistry::new(),
            gate: AuthorizationGate::new(config.intent, config.background_updates),
            orientation: config.orientation,
            applied_location: None,
            applied_heading: None,
            visit_monitoring: false,
            last_location: None,
            last_heading: None,
            permission_paused: Vec::new(),
            background_applied: false,
        };
        Self {
            hardware,
            config,
            state: Mutex::new(state),
            metrics,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Create, register and reconcile a location request.
    pub fn start_location_updates<S, E>(
        &self,
        options: LocationOptions,
        on_success: S,
        on_error: E,
    ) -> LocationResult<Arc<LocationRequest>>
    where
        S: Fn(&Position) + Send + Sync + 'static,
        E: Fn(&LocationError) + Send + Sync + 'static,
    {
        let request = Arc::new(LocationRequest::new(options, on_success, on_error));
        self.add_location_request(Arc::clone(&request))?;
        Ok(request)
    }

    /// Register an existing location request.
    ///
    /// Returns `Ok(false)` if it was already registered. Fails with
    /// [`LocationError::MissingAuthorizationDeclaration`] when permission is
    /// needed but no intent is declared; the request is not kept.
    pub fn add_location_request(&self, request: Arc<LocationRequest>) -> LocationResult<bool> {
        let id = request.id();
        let outcome = {
            let mut state = self.state.lock();
            if !state.locations.add(request) {
                debug!(%id, "Location request already registered");
                return Ok(false);
            }
            debug!(%id, registered = state.locations.len(), "Location request added");
            match self.reconcile_locations(&mut state) {
                Ok(outcome) => outcome,
                Err(error) => {
                    state.locations.remove(id);
                    warn!(%id, error = %error, "Location request rejected");
                    return Err(error);
                }
            }
        };
        self.settle(outcome);
        Ok(true)
    }

    /// Create, register and reconcile a heading request.
    ///
    /// `filter` is the minimum angular change in degrees; `None` reports every
    /// change.
    pub fn start_heading_updates<S, E>(
        &self,
        filter: Option<f64>,
        on_success: S,
        on_error: E,
    ) -> Arc<HeadingRequest>
    where
        S: Fn(&Heading) + Send + Sync + 'static,
        E: Fn(&LocationError) + Send + Sync + 'static,
    {
        let request = Arc::new(HeadingRequest::new(filter, on_success, on_error));
        self.add_heading_request(Arc::clone(&request));
        request
    }

    /// Register an existing heading request. Returns false if already present.
    pub fn add_heading_request(&self, request: Arc<HeadingRequest>) -> bool {
        let id = request.id();
        let mut state = self.state.lock();
        if !state.headings.add(request) {
            return false;
        }
        debug!(%id, "Heading request added");
        self.reconcile_headings(&mut state);
        true
    }

    /// Create and register a visit request. Visit requests start enabled.
    pub fn start_visit_monitoring<V>(&self, on_visit: V) -> Arc<VisitRequest>
    where
        V: Fn(&Visit) + Send + Sync + 'static,
    {
        let request = Arc::new(VisitRequest::new(on_visit));
        self.add_visit_request(Arc::clone(&request));
        request
    }

    /// Register an existing visit request. Returns false if already present.
    pub fn add_visit_request(&self, request: Arc<VisitRequest>) -> bool {
        let id = request.id();
        let mut state = self.state.lock();
        if !state.visits.add(request) {
            return false;
        }
        debug!(%id, "Visit request added");
        self.reconcile_visits(&mut state);
        true
    }

    /// Remove a request of any kind and reconcile its hardware configuration.
    ///
    /// Returns `Ok(false)` if no request has this identifier.
    pub fn stop(&self, id: RequestId) -> LocationResult<bool> {
        let outcome = {
            let mut state = self.state.lock();
            if state.locations.remove(id).is_some() {
                debug!(%id, "Location request stopped");
                self.reconcile_locations(&mut state)?
            } else if state.headings.remove(id).is_some() {
                debug!(%id, "Heading request stopped");
                self.reconcile_headings(&mut state);
                return Ok(true);
            } else if state.visits.remove(id).is_some() {
                debug!(%id, "Visit request stopped");
                self.reconcile_visits(&mut state);
                return Ok(true);
            } else {
                return Ok(false);
            }
        };
        self.settle(outcome);
        Ok(true)
    }

    /// Pause a request. Paused requests receive nothing and do not influence
    /// the hardware configuration.
    pub fn pause(&self, id: RequestId) -> LocationResult<()> {
        self.set_paused(id, true)
    }

    /// Resume a paused request.
    pub fn resume(&self, id: RequestId) -> LocationResult<()> {
        self.set_paused(id, false)
    }

    fn set_paused(&self, id: RequestId, paused: bool) -> LocationResult<()> {
        let toggle = |flags: &crate::request::RequestFlags| {
            if paused {
                flags.pause()
            } else {
                flags.resume()
            }
        };

        let outcome = {
            let mut state = self.state.lock();
            let kind = if let Some(request) = state.locations.get(id) {
                toggle(request.flags());
                state.permission_paused.retain(|paused_id| *paused_id != id);
                RequestKind::Location
            } else if let Some(request) = state.headings.get(id) {
                toggle(request.flags());
                RequestKind::Heading
            } else if let Some(request) = state.visits.get(id) {
                toggle(request.flags());
                RequestKind::Visit
            } else {
                return Err(LocationError::UnknownRequest(id));
            };
            debug!(%id, ?kind, paused, "Request pause state changed");

            match kind {
                RequestKind::Location => self.reconcile_locations(&mut state)?,
                RequestKind::Heading => {
                    self.reconcile_headings(&mut state);
                    return Ok(());
                }
                RequestKind::Visit => {
                    self.reconcile_visits(&mut state);
                    return Ok(());
                }
            }
        };
        self.settle(outcome);
        Ok(())
    }

    /// Change the orientation heading values are referenced to, re-applying
    /// the heading configuration if heading updates are running.
    pub fn set_heading_orientation(&self, orientation: DeviceOrientation) {
        let mut state = self.state.lock();
        if state.orientation == orientation {
            return;
        }
        state.orientation = orientation;
        debug!(?orientation, "Heading orientation changed");
        if state.applied_heading.is_some() {
            self.reconcile_headings(&mut state);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Most recent position reported by the hardware.
    pub fn last_location(&self) -> Option<Position> {
        self.state.lock().last_location.clone()
    }

    /// Most recent heading reported by the hardware.
    pub fn last_heading(&self) -> Option<Heading> {
        self.state.lock().last_heading.clone()
    }

    /// Authorization status as reported by the hardware.
    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.hardware.authorization_status()
    }

    /// Current authorization gate state.
    pub fn authorization_state(&self) -> GateState {
        self.state.lock().gate.state()
    }

    /// Returns true if any enabled heading request asks for calibration.
    ///
    /// Every request's predicate is consulted until one returns true.
    pub fn should_display_heading_calibration(&self) -> bool {
        let requests = self.state.lock().headings.enabled_snapshot();
        requests.iter().any(|request| request.needs_calibration())
    }

    /// Last applied position configuration; `None` while monitoring is off.
    pub fn location_config(&self) -> Option<LocationConfig> {
        self.state.lock().applied_location.clone()
    }

    /// Last applied heading filter; `None` while heading updates are off.
    pub fn heading_filter(&self) -> Option<HeadingFilter> {
        self.state.lock().applied_heading
    }

    /// Whether visit monitoring is on.
    pub fn is_monitoring_visits(&self) -> bool {
        self.state.lock().visit_monitoring
    }

    /// Current heading orientation.
    pub fn heading_orientation(&self) -> DeviceOrientation {
        self.state.lock().orientation
    }

    /// Number of registered requests of a kind, active or not.
    pub fn registered(&self, kind: RequestKind) -> usize {
        let state = self.state.lock();
        match kind {
            RequestKind::Location => state.locations.len(),
            RequestKind::Heading => state.headings.len(),
            RequestKind::Visit => state.visits.len(),
        }
    }

    /// Configuration the service was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    fn reconcile_locations(&self, state: &mut ServiceState) -> LocationResult<LocationOutcome> {
        self.metrics.reconciliation();

        let status = self.hardware.authorization_status();
        state.gate.observe(status);
        if state.gate.state().is_granted() {
            self.resume_permission_paused(state);
        }

        if !state.locations.has_enabled() {
            self.stop_location_hardware(state);
            return Ok(LocationOutcome::Idle);
        }

        let decision = state.gate.evaluate(status)?;
        self.sync_background(state);

        match decision {
            GateDecision::Pending => {
                debug!("Authorization pending, deferring location reconciliation");
                self.pause_for_permission(state);
                Ok(LocationOutcome::Deferred)
            }
            GateDecision::RequestPermission(level) => {
                self.pause_for_permission(state);
                self.metrics.permission_requested();

                match self.hardware.request_permission(level) {
                    Ok(()) => Ok(LocationOutcome::Deferred),
                    Err(error) => {
                        warn!(?level, error = %error, "Permission request failed");
                        state.gate.reset();
                        self.sync_background(state);
                        Ok(LocationOutcome::TornDown(
                            self.tear_down_locations(state, error.into()),
                        ))
                    }
                }
            }
            GateDecision::Refused(status) => {
                info!(%status, "Location access refused, terminating location requests");
                Ok(LocationOutcome::TornDown(self.tear_down_locations(
                    state,
                    LocationError::AuthorizationDenied(status),
                )))
            }
            GateDecision::Proceed => {
                let background = state.gate.background_delivery();
                let config = derive_location_config(
                    state.locations.enabled().map(|request| request.options()),
                    background,
                );
                let Some(config) = config else {
                    self.stop_location_hardware(state);
                    return Ok(LocationOutcome::Idle);
                };
                if state.applied_location.as_ref() != Some(&config) {
                    self.apply_location_config(&config);
                    state.applied_location = Some(config);
                }
                Ok(LocationOutcome::Applied)
            }
        }
    }

    fn apply_location_config(&self, config: &LocationConfig) {
        info!(
            accuracy = ?config.accuracy,
            frequency = ?config.frequency,
            activity = ?config.activity,
            distance_filter = ?config.distance_filter,
            background = config.allows_background_updates,
            "Applying location configuration"
        );
        match config.mode() {
            MonitoringMode::SignificantChanges => {
                self.hardware.stop_updates();
                self.hardware.start_significant_changes();
            }
            MonitoringMode::Continuous => {
                self.hardware.stop_significant_changes();
                self.hardware.start_updates(config);
            }
        }
    }

    /// Push the gate's background-delivery decision to the hardware if it
    /// changed.
    fn sync_background(&self, state: &mut ServiceState) {
        let wanted = state.gate.background_delivery();
        if wanted != state.background_applied {
            debug!(enabled = wanted, "Background location delivery changed");
            self.hardware.set_background_updates(wanted);
            state.background_applied = wanted;
        }
    }

    /// Pause every enabled location request until the prompt is answered.
    fn pause_for_permission(&self, state: &mut ServiceState) {
        for request in state.locations.enabled_snapshot() {
            request.pause();
            state.permission_paused.push(request.id());
        }
    }

    /// Resume the requests the gate paused for a permission prompt.
    fn resume_permission_paused(&self, state: &mut ServiceState) {
        for id in state.permission_paused.drain(..) {
            if let Some(request) = state.locations.get(id) {
                request.resume();
            }
        }
    }

    /// Stop position monitoring and unregister every location request.
    fn tear_down_locations(&self, state: &mut ServiceState, error: LocationError) -> Teardown {
        self.stop_location_hardware(state);
        state.permission_paused.clear();
        Teardown {
            requests: state.locations.drain(),
            error,
        }
    }

    fn stop_location_hardware(&self, state: &mut ServiceState) {
        if state.applied_location.take().is_some() {
            debug!("Stopping location monitoring");
        }
        self.hardware.stop_updates();
        self.hardware.stop_significant_changes();
    }

    fn reconcile_headings(&self, state: &mut ServiceState) {
        match derive_heading_filter(state.headings.enabled().map(|request| request.filter())) {
            Some(filter) => {
                debug!(?filter, orientation = ?state.orientation, "Applying heading configuration");
                self.hardware.start_heading(filter, state.orientation);
                state.applied_heading = Some(filter);
            }
            None => {
                state.applied_heading = None;
                self.hardware.stop_heading();
            }
        }
    }

    fn reconcile_visits(&self, state: &mut ServiceState) {
        let wanted = state.visits.has_enabled();
        if wanted == state.visit_monitoring {
            return;
        }
        state.visit_monitoring = wanted;
        if wanted {
            debug!("Starting visit monitoring");
            self.hardware.start_visit_monitoring();
        } else {
            debug!("Stopping visit monitoring");
            self.hardware.stop_visit_monitoring();
        }
    }

    /// Deliver the consequences of a reconciliation pass. Call without the lock.
    fn settle(&self, outcome: LocationOutcome) {
        match outcome {
            LocationOutcome::TornDown(teardown) => self.fail_all(teardown),
            LocationOutcome::Idle | LocationOutcome::Applied | LocationOutcome::Deferred => {}
        }
    }

    fn fail_all(&self, teardown: Teardown) {
        for request in &teardown.requests {
            if request.fail(&teardown.error) {
                self.metrics.error_delivered();
            }
        }
    }
}
