//! Authorization gate.
//!
//! Decides whether location reconciliation may touch the hardware, and which
//! permission request to issue when it may not yet.
//!
//! # State Machine
//!
//! ```text
//! Undetermined --[evaluate, intent declared]--> RequestPending
//! Undetermined --[evaluate, no intent]--------> error (MissingAuthorizationDeclaration)
//! RequestPending --[status granted]-----------> GrantedWhenInUse | GrantedAlways
//! RequestPending --[status denied/restricted]-> Refused
//! Granted* --[status denied/restricted]-------> Refused
//! Refused --[status granted]------------------> Granted*
//! any --[event: not determined]---------------> Undetermined (unless RequestPending)
//! ```
//!
//! Status changes arrive two ways. Authorization-change events are
//! authoritative. Readings of the hardware's status getter taken during
//! reconciliation may lag behind them, so a `NotDetermined` reading never
//! moves the gate out of a pending, granted or refused state.

use tracing::{debug, info};

use crate::error::LocationError;
use crate::model::{AuthorizationIntent, AuthorizationStatus, PermissionLevel};

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nobody has asked the user yet.
    Undetermined,
    /// A permission prompt is in flight.
    RequestPending(PermissionLevel),
    /// Foreground access granted.
    GrantedWhenInUse,
    /// Background access granted.
    GrantedAlways,
    /// Denied or restricted.
    Refused(AuthorizationStatus),
}

impl GateState {
    fn from_status(status: AuthorizationStatus) -> Self {
        match status {
            AuthorizationStatus::NotDetermined => GateState::Undetermined,
            AuthorizationStatus::AuthorizedWhenInUse => GateState::GrantedWhenInUse,
            AuthorizationStatus::AuthorizedAlways => GateState::GrantedAlways,
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                GateState::Refused(status)
            }
        }
    }

    /// Returns true for either granted state.
    pub fn is_granted(&self) -> bool {
        matches!(self, GateState::GrantedWhenInUse | GateState::GrantedAlways)
    }
}

/// What reconciliation should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Authorized: configure the hardware.
    Proceed,
    /// Issue this permission request, pause location requests, and defer.
    RequestPermission(PermissionLevel),
    /// A permission request is already in flight: defer.
    Pending,
    /// Access refused: tear down location requests.
    Refused(AuthorizationStatus),
}

/// Outcome of an authorization-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationTransition {
    /// Access became (or stayed) granted: resume and reconcile.
    Granted,
    /// Access was refused: terminate location requests.
    Revoked(AuthorizationStatus),
    /// Nothing for the service to act on.
    Unchanged,
}

/// Authorization gate, owned by the service.
#[derive(Debug)]
pub struct AuthorizationGate {
    intent: AuthorizationIntent,
    background_entitlement: bool,
    state: GateState,
    background_delivery: bool,
}

impl AuthorizationGate {
    /// Create a gate for the application's declared intent.
    pub fn new(intent: AuthorizationIntent, background_entitlement: bool) -> Self {
        Self {
            intent,
            background_entitlement,
            state: GateState::Undetermined,
            background_delivery: false,
        }
    }

    /// Current gate state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Declared intent.
    pub fn intent(&self) -> AuthorizationIntent {
        self.intent
    }

    /// Whether background delivery has been enabled for an always-request.
    pub fn background_delivery(&self) -> bool {
        self.background_delivery
    }

    /// Decide what reconciliation may do, given the hardware's current status.
    ///
    /// Transitions `Undetermined` to `RequestPending` when it asks for a
    /// permission request. Fails with
    /// [`LocationError::MissingAuthorizationDeclaration`] when no intent is
    /// declared.
    pub fn evaluate(&mut self, status: AuthorizationStatus) -> Result<GateDecision, LocationError> {
        self.observe(status);

        match self.state {
            GateState::GrantedWhenInUse | GateState::GrantedAlways => Ok(GateDecision::Proceed),
            GateState::RequestPending(_) => Ok(GateDecision::Pending),
            GateState::Refused(status) => Ok(GateDecision::Refused(status)),
            GateState::Undetermined => {
                let level = match self.intent {
                    AuthorizationIntent::None => {
                        return Err(LocationError::MissingAuthorizationDeclaration)
                    }
                    AuthorizationIntent::WhenInUse => PermissionLevel::WhenInUse,
                    AuthorizationIntent::Always => PermissionLevel::Always,
                };
                self.background_delivery =
                    level == PermissionLevel::Always && self.background_entitlement;
                self.state = GateState::RequestPending(level);
                info!(?level, "Requesting location authorization");
                Ok(GateDecision::RequestPermission(level))
            }
        }
    }

    /// Apply an authorization-change event.
    pub fn on_status_changed(&mut self, status: AuthorizationStatus) -> AuthorizationTransition {
        let previous = self.state;
        self.apply(status);
        debug!(?previous, current = ?self.state, %status, "Authorization status changed");

        match self.state {
            GateState::GrantedWhenInUse | GateState::GrantedAlways => {
                AuthorizationTransition::Granted
            }
            GateState::Refused(status) if previous != self.state => {
                AuthorizationTransition::Revoked(status)
            }
            _ => AuthorizationTransition::Unchanged,
        }
    }

    /// Return to `Undetermined` after a permission request could not be issued.
    pub fn reset(&mut self) {
        self.state = GateState::Undetermined;
        self.background_delivery = false;
    }

    /// Fold in a status-getter reading.
    pub fn observe(&mut self, status: AuthorizationStatus) {
        if status == AuthorizationStatus::NotDetermined && self.state != GateState::Undetermined {
            return;
        }
        self.apply(status);
    }

    fn apply(&mut self, status: AuthorizationStatus) {
        let observed = GateState::from_status(status);
        if observed == GateState::Undetermined && matches!(self.state, GateState::RequestPending(_))
        {
            return;
        }
        self.state = observed;
        match self.state {
            GateState::GrantedAlways => {
                self.background_delivery =
                    self.intent == AuthorizationIntent::Always && self.background_entitlement;
            }
            GateState::GrantedWhenInUse | GateState::Refused(_) => {
                self.background_delivery = false;
            }
            GateState::Undetermined | GateState::RequestPending(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_intent_fails_fast() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::None, false);
        let result = gate.evaluate(AuthorizationStatus::NotDetermined);

        assert_eq!(result, Err(LocationError::MissingAuthorizationDeclaration));
        assert_eq!(gate.state(), GateState::Undetermined);
    }

    #[test]
    fn test_when_in_use_request_without_background() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::WhenInUse, true);
        let decision = gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();

        assert_eq!(
            decision,
            GateDecision::RequestPermission(PermissionLevel::WhenInUse)
        );
        assert!(!gate.background_delivery());
        assert_eq!(
            gate.state(),
            GateState::RequestPending(PermissionLevel::WhenInUse)
        );
    }

    #[test]
    fn test_always_request_enables_background_with_entitlement() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::Always, true);
        let decision = gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();

        assert_eq!(
            decision,
            GateDecision::RequestPermission(PermissionLevel::Always)
        );
        assert!(gate.background_delivery());

        let mut gate = AuthorizationGate::new(AuthorizationIntent::Always, false);
        gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();
        assert!(!gate.background_delivery());
    }

    #[test]
    fn test_pending_defers_until_answer() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::WhenInUse, false);
        gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();

        assert_eq!(
            gate.evaluate(AuthorizationStatus::NotDetermined).unwrap(),
            GateDecision::Pending
        );

        assert_eq!(
            gate.on_status_changed(AuthorizationStatus::AuthorizedWhenInUse),
            AuthorizationTransition::Granted
        );
        assert_eq!(
            gate.evaluate(AuthorizationStatus::AuthorizedWhenInUse).unwrap(),
            GateDecision::Proceed
        );
    }

    #[test]
    fn test_granted_status_proceeds_immediately() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::None, false);
        assert_eq!(
            gate.evaluate(AuthorizationStatus::AuthorizedAlways).unwrap(),
            GateDecision::Proceed
        );
        assert_eq!(gate.state(), GateState::GrantedAlways);
    }

    #[test]
    fn test_revocation_reported_once() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::WhenInUse, false);
        gate.on_status_changed(AuthorizationStatus::AuthorizedWhenInUse);

        assert_eq!(
            gate.on_status_changed(AuthorizationStatus::Denied),
            AuthorizationTransition::Revoked(AuthorizationStatus::Denied)
        );
        assert_eq!(
            gate.on_status_changed(AuthorizationStatus::Denied),
            AuthorizationTransition::Unchanged
        );
        assert_eq!(
            gate.evaluate(AuthorizationStatus::Denied).unwrap(),
            GateDecision::Refused(AuthorizationStatus::Denied)
        );
    }

    #[test]
    fn test_background_follows_always_grant() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::Always, true);
        gate.on_status_changed(AuthorizationStatus::AuthorizedAlways);
        assert!(gate.background_delivery());

        gate.on_status_changed(AuthorizationStatus::AuthorizedWhenInUse);
        assert!(!gate.background_delivery());

        let mut gate = AuthorizationGate::new(AuthorizationIntent::WhenInUse, true);
        gate.on_status_changed(AuthorizationStatus::AuthorizedAlways);
        assert!(!gate.background_delivery());
    }

    #[test]
    fn test_lagging_reading_keeps_granted_state() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::WhenInUse, false);
        gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();
        gate.on_status_changed(AuthorizationStatus::AuthorizedWhenInUse);

        assert_eq!(
            gate.evaluate(AuthorizationStatus::NotDetermined).unwrap(),
            GateDecision::Proceed
        );
        assert_eq!(gate.state(), GateState::GrantedWhenInUse);

        gate.on_status_changed(AuthorizationStatus::Denied);
        assert_eq!(
            gate.evaluate(AuthorizationStatus::NotDetermined).unwrap(),
            GateDecision::Refused(AuthorizationStatus::Denied)
        );

        gate.on_status_changed(AuthorizationStatus::NotDetermined);
        assert_eq!(gate.state(), GateState::Undetermined);
    }

    #[test]
    fn test_reset_returns_to_undetermined() {
        let mut gate = AuthorizationGate::new(AuthorizationIntent::Always, true);
        gate.evaluate(AuthorizationStatus::NotDetermined).unwrap();
        gate.reset();

        assert_eq!(gate.state(), GateState::Undetermined);
        assert!(!gate.background_delivery());
    }
}
