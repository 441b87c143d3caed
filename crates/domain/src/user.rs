use crate::value_objects::{ImageUrl, PasswordHash, Timestamp, UserEmail, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub profile_pic: Option<ImageUrl>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        email: UserEmail,
        password: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password,
            profile_pic: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_profile_pic(&mut self, image: ImageUrl, now: Timestamp) {
        self.profile_pic = Some(image);
        self.updated_at = now;
    }
}
