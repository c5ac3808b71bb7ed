use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use sift_domain::UserProfile;
use sift_storage::models::UserRow;

use crate::{Error, Result, SiftService, bounded};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
	pub user_id: i64,
	pub username: String,
	pub email: String,
	pub role: String,
	pub specialization: Option<String>,
	pub faculty: Option<String>,
	pub course: Option<i32>,
	pub interests: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl UserRecord {
	pub fn profile(&self) -> UserProfile {
		UserProfile {
			user_id: self.user_id,
			username: self.username.clone(),
			role: self.role.clone(),
			specialization: self.specialization.clone(),
			faculty: self.faculty.clone(),
			course: self.course,
			interests: self.interests.clone(),
		}
	}
}
impl From<UserRow> for UserRecord {
	fn from(row: UserRow) -> Self {
		Self {
			user_id: row.user_id,
			username: row.username,
			email: row.email,
			role: row.role,
			specialization: row.specialization,
			faculty: row.faculty,
			course: row.course,
			interests: row.interests,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersRequest {
	pub role: Option<String>,
	pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsResponse {
	pub user_id: i64,
	pub username: String,
	pub role: String,
	pub specialization: Option<String>,
	pub total_clicks: u64,
}

impl SiftService {
	pub async fn list_users(&self, req: ListUsersRequest) -> Result<Vec<UserRecord>> {
		let limit = req.limit.unwrap_or(DEFAULT_LIST_LIMIT);

		if !(1..=MAX_LIST_LIMIT).contains(&limit) {
			return Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {MAX_LIST_LIMIT}."),
			});
		}

		let role = req.role.as_deref().map(str::trim).filter(|role| !role.is_empty());

		bounded(
			self.store_timeout(),
			"User listing",
			self.backends.profiles.list_users(role, limit),
		)
		.await
	}

	pub async fn get_user(&self, user_id: i64) -> Result<UserRecord> {
		bounded(self.store_timeout(), "User lookup", self.backends.profiles.fetch_user(user_id))
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("User {user_id} does not exist.") })
	}

	pub async fn user_stats(&self, user_id: i64) -> Result<UserStatsResponse> {
		let user = self.get_user(user_id).await?;
		let total_clicks = bounded(
			self.store_timeout(),
			"User click count",
			self.backends.profiles.user_click_count(user_id),
		)
		.await?;

		Ok(UserStatsResponse {
			user_id: user.user_id,
			username: user.username,
			role: user.role,
			specialization: user.specialization,
			total_clicks,
		})
	}
}
