use crate::{
	Error, Result,
	db::Db,
	models::UserRow,
};

const USER_COLUMNS: &str = "\
user_id, username, email, role, specialization, faculty, course, interests, created_at, updated_at";

pub async fn fetch_user(db: &Db, user_id: i64) -> Result<Option<UserRow>> {
	let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
	let row = sqlx::query_as::<_, UserRow>(&sql).bind(user_id).fetch_optional(&db.pool).await?;

	Ok(row)
}

/// Users ordered by id, optionally restricted to one role.
pub async fn list_users(db: &Db, role: Option<&str>, limit: i64) -> Result<Vec<UserRow>> {
	if limit <= 0 {
		return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
	}

	let sql = format!(
		"\
SELECT {USER_COLUMNS}
FROM users
WHERE ($1::text IS NULL OR role = $1)
ORDER BY user_id
LIMIT $2"
	);
	let rows = sqlx::query_as::<_, UserRow>(&sql)
		.bind(role)
		.bind(limit)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

pub async fn user_click_count(db: &Db, user_id: i64) -> Result<u64> {
	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE user_id = $1")
		.bind(user_id)
		.fetch_one(&db.pool)
		.await?;

	Ok(u64::try_from(count).unwrap_or(0))
}
