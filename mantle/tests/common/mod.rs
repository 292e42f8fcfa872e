#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use mantle::{
    embedded, model,
    serde::{Deserialize, Serialize},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(crate = "mantle::serde", rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Manager,
    Author,
    Reader,
}

fn reader() -> UserType {
    UserType::Reader
}

#[model(database = "default", collection = "test_user")]
#[derive(PartialEq)]
pub struct User {
    pub username: String,
    #[serde(with = "mantle::types::datetime")]
    pub created: DateTime<Utc>,
    pub age: Option<i32>,
    #[serde(rename = "type", default = "reader")]
    #[builder(default = "UserType::Reader")]
    pub kind: UserType,
}

#[embedded]
pub struct Comment {
    pub body: String,
    #[serde(with = "mantle::types::datetime")]
    pub created: DateTime<Utc>,
}

#[model(database = "default", collection = "test_post")]
pub struct Post {
    pub title: String,
    pub body: String,
    pub author: User,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
}

/// Partial update payload; unset fields are left out of the document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(crate = "mantle::serde")]
pub struct UserSerializer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(with = "mantle::types::datetime::option", skip_serializing_if = "Option::is_none", default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

/// Current time at the millisecond precision MongoDB stores
pub fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(Utc::now().timestamp_millis()).unwrap()
}

pub fn user(username: &str, age: i32) -> User {
    UserBuilder::default()
        .username(username)
        .created(now())
        .age(age)
        .build()
        .unwrap()
}
