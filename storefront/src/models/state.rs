// Application state (in-memory)
//
// NOTE: This is NOT persisted. It is created once by the host and passed by reference to
// whatever needs the session or the cached entity collections; nothing reaches it through a
// global.

use super::responses::{MaintenanceAppointment, Role, Vehicle};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    pub token: String,
}

/// Which collection a loading flag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Vehicles,
    Appointments,
    Users,
}

#[derive(Debug, Default)]
pub struct AppState {
    inner: Mutex<AppStateInner>,
}

#[derive(Debug, Default)]
struct AppStateInner {
    session: Option<Session>,
    vehicles: Vec<Vehicle>,
    appointments: Vec<MaintenanceAppointment>,
    loading_vehicles: bool,
    loading_appointments: bool,
    loading_users: bool,
}

impl AppState {
    pub async fn sign_in(&self, session: Session) {
        let mut inner = self.inner.lock().await;
        inner.session = Some(session);
    }

    /// Drops the session and every cached collection.
    pub async fn sign_out(&self) {
        let mut inner = self.inner.lock().await;
        *inner = AppStateInner::default();
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.lock().await.session.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub async fn role(&self) -> Option<Role> {
        self.inner.lock().await.session.as_ref().map(|s| s.role)
    }

    pub async fn set_loading(&self, collection: Collection, loading: bool) {
        let mut inner = self.inner.lock().await;
        match collection {
            Collection::Vehicles => inner.loading_vehicles = loading,
            Collection::Appointments => inner.loading_appointments = loading,
            Collection::Users => inner.loading_users = loading,
        }
    }

    pub async fn is_loading(&self, collection: Collection) -> bool {
        let inner = self.inner.lock().await;
        match collection {
            Collection::Vehicles => inner.loading_vehicles,
            Collection::Appointments => inner.loading_appointments,
            Collection::Users => inner.loading_users,
        }
    }

    pub async fn replace_vehicles(&self, vehicles: Vec<Vehicle>) {
        self.inner.lock().await.vehicles = vehicles;
    }

    /// Insert or replace by id.
    pub async fn upsert_vehicle(&self, vehicle: Vehicle) {
        let mut inner = self.inner.lock().await;
        match inner.vehicles.iter_mut().find(|v| v.id == vehicle.id) {
            Some(existing) => *existing = vehicle,
            None => inner.vehicles.push(vehicle),
        }
    }

    pub async fn remove_vehicle(&self, id: &str) {
        self.inner.lock().await.vehicles.retain(|v| v.id != id);
    }

    pub async fn vehicles(&self) -> Vec<Vehicle> {
        self.inner.lock().await.vehicles.clone()
    }

    pub async fn replace_appointments(&self, appointments: Vec<MaintenanceAppointment>) {
        self.inner.lock().await.appointments = appointments;
    }

    pub async fn upsert_appointment(&self, appointment: MaintenanceAppointment) {
        let mut inner = self.inner.lock().await;
        match inner
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
        {
            Some(existing) => *existing = appointment,
            None => inner.appointments.push(appointment),
        }
    }

    pub async fn remove_appointment(&self, id: &str) {
        self.inner.lock().await.appointments.retain(|a| a.id != id);
    }

    pub async fn appointments(&self) -> Vec<MaintenanceAppointment> {
        self.inner.lock().await.appointments.clone()
    }
}
