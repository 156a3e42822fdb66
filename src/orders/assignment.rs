//! Assignment lookup over the taxi_orders table.
//!
//! An assignment is the most recent non-cancelled order linking one captain
//! to one primary rider plus zero or more passengers. The relay core only
//! ever reads assignments; orders are created and cancelled elsewhere.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DbPool;

/// The externally-owned record resolved for dispatch and the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub order_id: String,
    pub captain_id: String,
    pub rider_id: String,
    pub passenger_ids: Vec<String>,
}

impl Assignment {
    /// Primary rider first, then every passenger.
    pub fn rider_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.rider_id.as_str())
            .chain(self.passenger_ids.iter().map(String::as_str))
    }
}

/// Most recent non-cancelled order for a captain, or None when the captain
/// has no active assignment.
pub fn most_recent_active_by_captain(
    db: &DbPool,
    captain_id: &str,
) -> Result<Option<Assignment>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let row = conn
        .query_row(
            "SELECT id, captain_id, user_id FROM taxi_orders
             WHERE captain_id = ?1 AND cancelled = 0
             ORDER BY created_at DESC LIMIT 1",
            params![captain_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((order_id, captain_id, rider_id)) => {
            let passenger_ids = order_passengers(&conn, &order_id)?;
            Ok(Some(Assignment {
                order_id,
                captain_id,
                rider_id,
                passenger_ids,
            }))
        }
        None => Ok(None),
    }
}

/// Most recent non-cancelled order a rider belongs to, as primary rider or
/// as passenger, or None when the rider has no active assignment.
pub fn most_recent_active_by_rider(
    db: &DbPool,
    rider_id: &str,
) -> Result<Option<Assignment>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let row = conn
        .query_row(
            "SELECT o.id, o.captain_id, o.user_id FROM taxi_orders o
             WHERE o.cancelled = 0
               AND (o.user_id = ?1
                    OR EXISTS (SELECT 1 FROM order_passengers p
                               WHERE p.order_id = o.id AND p.user_id = ?1))
             ORDER BY o.created_at DESC LIMIT 1",
            params![rider_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((order_id, captain_id, primary_id)) => {
            let passenger_ids = order_passengers(&conn, &order_id)?;
            Ok(Some(Assignment {
                order_id,
                captain_id,
                rider_id: primary_id,
                passenger_ids,
            }))
        }
        None => Ok(None),
    }
}

fn order_passengers(conn: &Connection, order_id: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM order_passengers WHERE order_id = ?1 ORDER BY user_id")?;
    let ids = stmt
        .query_map(params![order_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db_in_memory;

    fn seed_user(db: &DbPool, id: &str) {
        let conn = db.lock().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, role, created_at, updated_at)
             VALUES (?1, ?1, 'user', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            params![id],
        )
        .unwrap();
    }

    fn seed_order(db: &DbPool, id: &str, captain: &str, rider: &str, created_at: &str, cancelled: bool) {
        let conn = db.lock().unwrap();
        conn.execute(
            "INSERT INTO taxi_orders (id, captain_id, user_id, destination_lat, destination_lng, cancelled, created_at)
             VALUES (?1, ?2, ?3, 10.0, 20.0, ?4, ?5)",
            params![id, captain, rider, cancelled, created_at],
        )
        .unwrap();
    }

    fn seed_passenger(db: &DbPool, order: &str, rider: &str) {
        let conn = db.lock().unwrap();
        conn.execute(
            "INSERT INTO order_passengers (order_id, user_id) VALUES (?1, ?2)",
            params![order, rider],
        )
        .unwrap();
    }

    #[test]
    fn by_captain_returns_most_recent_non_cancelled() {
        let db = init_db_in_memory().unwrap();
        for id in ["c1", "u1", "u2", "u3"] {
            seed_user(&db, id);
        }
        seed_order(&db, "o1", "c1", "u1", "2026-01-01T10:00:00Z", false);
        seed_order(&db, "o2", "c1", "u2", "2026-01-02T10:00:00Z", false);
        seed_order(&db, "o3", "c1", "u3", "2026-01-03T10:00:00Z", true);
        seed_passenger(&db, "o2", "u3");

        let assignment = most_recent_active_by_captain(&db, "c1")
            .unwrap()
            .expect("active assignment");
        assert_eq!(assignment.order_id, "o2");
        assert_eq!(assignment.rider_id, "u2");
        assert_eq!(assignment.passenger_ids, vec!["u3".to_string()]);

        let ids: Vec<&str> = assignment.rider_ids().collect();
        assert_eq!(ids, vec!["u2", "u3"]);
    }

    #[test]
    fn by_captain_none_when_only_cancelled() {
        let db = init_db_in_memory().unwrap();
        seed_user(&db, "c1");
        seed_user(&db, "u1");
        seed_order(&db, "o1", "c1", "u1", "2026-01-01T10:00:00Z", true);

        assert!(most_recent_active_by_captain(&db, "c1").unwrap().is_none());
    }

    #[test]
    fn by_rider_matches_primary_and_passenger_membership() {
        let db = init_db_in_memory().unwrap();
        for id in ["c1", "c2", "u1", "u2"] {
            seed_user(&db, id);
        }
        seed_order(&db, "o1", "c1", "u1", "2026-01-01T10:00:00Z", false);
        seed_order(&db, "o2", "c2", "u2", "2026-01-02T10:00:00Z", false);
        seed_passenger(&db, "o2", "u1");

        // u1 is primary on o1 but passenger on the newer o2
        let assignment = most_recent_active_by_rider(&db, "u1")
            .unwrap()
            .expect("active assignment");
        assert_eq!(assignment.order_id, "o2");
        assert_eq!(assignment.captain_id, "c2");

        assert!(most_recent_active_by_rider(&db, "nobody").unwrap().is_none());
    }
}
