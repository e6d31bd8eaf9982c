use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::notification::{NotificationKind, Recipient};
use crate::domain::ports::Notifier;
use crate::schema::{notifications, users};

use super::models::NewNotificationRow;

const ADMIN_ROLE: &str = "admin";

/// Stores notifications as rows in `notifications`, one per recipient user.
pub struct DieselNotifier {
    pool: DbPool,
}

impl DieselNotifier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Notifier for DieselNotifier {
    fn notify(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
        content: &str,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let user_ids: Vec<Uuid> = match recipient {
            Recipient::User(id) => vec![id],
            Recipient::Admins => users::table
                .filter(users::role_name.eq(ADMIN_ROLE))
                .select(users::id)
                .load(&mut conn)?,
        };
        if user_ids.is_empty() {
            log::warn!("No recipients for {} notification", kind.as_str());
            return Ok(());
        }

        let rows: Vec<NewNotificationRow> = user_ids
            .iter()
            .map(|user_id| NewNotificationRow {
                id: Uuid::new_v4(),
                user_id: *user_id,
                kind: kind.as_str(),
                content,
            })
            .collect();
        diesel::insert_into(notifications::table)
            .values(&rows)
            .execute(&mut conn)?;

        log::info!(
            "Sent {} notification to {} user(s)",
            kind.as_str(),
            user_ids.len()
        );
        Ok(())
    }
}
