use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::password;
use crate::database::models::user::{Role, SalaryType, User};

/// Matching threshold for face descriptors. Two captures of the same face
/// land well under this distance with the 128-dimension embeddings the
/// mobile client produces.
pub const FACE_MATCH_THRESHOLD: f64 = 0.6;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Face not registered")]
    FaceNotRegistered,

    #[error("Face descriptor is malformed")]
    InvalidDescriptor,

    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub salary_type: Option<SalaryType>,
    pub salary: Option<f64>,
    pub start_work_time: Option<String>,
    pub late_penalty: Option<f64>,
}

fn default_role() -> Role {
    Role::User
}

/// Admin-side edits; every field optional, `None` keeps the stored value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub photo: Option<String>,
    pub is_active: Option<bool>,
    pub salary_type: Option<SalaryType>,
    pub salary: Option<f64>,
    pub start_work_time: Option<String>,
    pub late_penalty: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceStatus {
    pub face_registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerification {
    pub matched: bool,
    pub distance: f64,
}

pub struct UserService<'a> {
    pool: &'a PgPool,
}

impl<'a> UserService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        let digest = password::hash(&new_user.password).await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users \
                (email, password, name, role, salary_type, salary, start_work_time, late_penalty) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING *",
        )
        .bind(&new_user.email)
        .bind(&digest)
        .bind(&new_user.name)
        .bind(new_user.role)
        .bind(new_user.salary_type.unwrap_or(SalaryType::Monthly))
        .bind(new_user.salary.unwrap_or(0.0))
        .bind(new_user.start_work_time.as_deref().unwrap_or("09:00"))
        .bind(new_user.late_penalty.unwrap_or(0.0))
        .fetch_one(self.pool)
        .await
        .map_err(map_duplicate_email)?;

        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    pub async fn get(&self, user_id: i32) -> Result<User, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn update(&self, user_id: i32, changes: UserUpdate) -> Result<User, UserError> {
        let current = self.get(user_id).await?;

        let digest = match changes.password {
            Some(plaintext) => password::hash(&plaintext).await?,
            None => current.password,
        };

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET \
                email = $1, password = $2, name = $3, role = $4, photo = $5, \
                is_active = $6, salary_type = $7, salary = $8, \
                start_work_time = $9, late_penalty = $10, updated_at = now() \
             WHERE id = $11 \
             RETURNING *",
        )
        .bind(changes.email.unwrap_or(current.email))
        .bind(&digest)
        .bind(changes.name.unwrap_or(current.name))
        .bind(changes.role.unwrap_or(current.role))
        .bind(changes.photo.or(current.photo))
        .bind(changes.is_active.unwrap_or(current.is_active))
        .bind(changes.salary_type.unwrap_or(current.salary_type))
        .bind(changes.salary.unwrap_or(current.salary))
        .bind(changes.start_work_time.unwrap_or(current.start_work_time))
        .bind(changes.late_penalty.unwrap_or(current.late_penalty))
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(map_duplicate_email)?;

        Ok(user)
    }

    pub async fn delete(&self, user_id: i32) -> Result<(), UserError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    /// Store (or replace) the caller's reference descriptor
    pub async fn register_face(
        &self,
        user_id: i32,
        descriptor: &[f64],
    ) -> Result<FaceStatus, UserError> {
        let encoded = encode_descriptor(descriptor)?;

        let result = sqlx::query(
            "UPDATE users SET face_descriptor = $1, face_registered = true, updated_at = now() \
             WHERE id = $2",
        )
        .bind(&encoded)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }

        Ok(FaceStatus {
            face_registered: true,
        })
    }

    /// Compare a fresh capture against the stored reference
    pub async fn verify_face(
        &self,
        user_id: i32,
        descriptor: &[f64],
    ) -> Result<FaceVerification, UserError> {
        let user = self.get(user_id).await?;
        let stored = user
            .face_descriptor
            .as_deref()
            .filter(|_| user.face_registered)
            .ok_or(UserError::FaceNotRegistered)?;
        let reference = decode_descriptor(stored)?;

        let distance = euclidean_distance(descriptor, &reference)?;
        Ok(FaceVerification {
            matched: distance <= FACE_MATCH_THRESHOLD,
            distance,
        })
    }

    pub async fn face_status(&self, user_id: i32) -> Result<FaceStatus, UserError> {
        let user = self.get(user_id).await?;
        Ok(FaceStatus {
            face_registered: user.face_registered,
        })
    }
}

fn map_duplicate_email(err: sqlx::Error) -> UserError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return UserError::DuplicateEmail;
        }
    }
    UserError::Database(err)
}

fn encode_descriptor(descriptor: &[f64]) -> Result<String, UserError> {
    if descriptor.is_empty() || !descriptor.iter().all(|v| v.is_finite()) {
        return Err(UserError::InvalidDescriptor);
    }
    serde_json::to_string(descriptor).map_err(|_| UserError::InvalidDescriptor)
}

fn decode_descriptor(raw: &str) -> Result<Vec<f64>, UserError> {
    serde_json::from_str(raw).map_err(|_| UserError::InvalidDescriptor)
}

/// Straight L2 distance; lengths must agree or the capture is rejected
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, UserError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(UserError::InvalidDescriptor);
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_descriptors_have_zero_distance() {
        let d = vec![0.1, -0.2, 0.3];
        assert_eq!(euclidean_distance(&d, &d).unwrap(), 0.0);
    }

    #[test]
    fn distance_matches_hand_computation() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn near_capture_passes_and_far_capture_fails() {
        let reference = vec![0.5; 128];
        let mut near = reference.clone();
        near[0] += 0.01;
        let far: Vec<f64> = reference.iter().map(|v| v + 0.1).collect();

        let near_dist = euclidean_distance(&near, &reference).unwrap();
        let far_dist = euclidean_distance(&far, &reference).unwrap();
        assert!(near_dist <= FACE_MATCH_THRESHOLD);
        assert!(far_dist > FACE_MATCH_THRESHOLD);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            euclidean_distance(&[1.0], &[1.0, 2.0]),
            Err(UserError::InvalidDescriptor)
        ));
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let d = vec![0.25, -1.5, 3.0];
        let encoded = encode_descriptor(&d).unwrap();
        assert_eq!(decode_descriptor(&encoded).unwrap(), d);
    }

    #[test]
    fn non_finite_descriptor_is_rejected() {
        assert!(matches!(
            encode_descriptor(&[f64::NAN]),
            Err(UserError::InvalidDescriptor)
        ));
        assert!(matches!(encode_descriptor(&[]), Err(UserError::InvalidDescriptor)));
    }
}
