/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub picture: Option<String>,
    pub role: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Taxi order record linking a captain to a primary rider and a destination
#[derive(Debug, Clone)]
pub struct TaxiOrderRow {
    pub id: String,
    pub captain_id: String,
    pub user_id: String,
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub cancelled: bool,
    pub created_at: String,
}

/// Secondary rider on an order
#[derive(Debug, Clone)]
pub struct OrderPassengerRow {
    pub order_id: String,
    pub user_id: String,
}

/// Registered push device token for a user
#[derive(Debug, Clone)]
pub struct NotificationTokenRow {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub created_at: String,
}

/// Saved store-and-forward notification
#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
}
