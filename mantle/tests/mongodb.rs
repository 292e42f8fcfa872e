//! Tests against a live MongoDB server.
//!
//! Run with: MONGODB_URL="mongodb://localhost:27017" cargo test -p mantle --test mongodb -- --ignored

mod common;

use std::future::Future;

use common::*;
use futures_util::TryStreamExt;
use mantle::{
    ConnectionSettings, DatabaseSettings, Embedded, Error, Manager, Model, get_db_manager,
    bson::doc,
};
use once_cell::sync::Lazy;
use tokio::{runtime::Runtime, sync::Mutex};

const DATABASE: &str = "test_mongo";

// Clients are bound to the runtime that created them, so every test shares one.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| Runtime::new().unwrap());
static LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn run<F: Future<Output = ()>>(test: F) {
    RUNTIME.block_on(async {
        let _guard = LOCK.lock().await;
        let url = std::env::var("MONGODB_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let settings = DatabaseSettings::new().with(
            "default",
            ConnectionSettings {
                name: Some(DATABASE.to_string()),
                host: Some(url),
                ..Default::default()
            },
        );
        let manager = Manager::init_connections(settings).await.unwrap();
        manager.database("default").unwrap().drop().await.unwrap();
        test.await;
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn manager_registers_the_default_alias() {
    run(async {
        let manager = get_db_manager().unwrap();
        assert_eq!(manager.aliases().collect::<Vec<_>>(), vec!["default"]);
        assert_eq!(manager.database("default").unwrap().name(), DATABASE);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn save_new_model() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();
        let id = model.id().unwrap();
        assert_eq!(model.snapshot().unwrap().get_object_id("id").unwrap(), id);

        let stored = User::find_one(doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored.username, "test");
        assert_eq!(stored.created, model.created);
        assert_eq!(User::count(None).await.unwrap(), 1);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn save_existing_model_writes_changes() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();
        let id = model.id().unwrap();

        model.username = "renamed".into();
        model.age = None;
        model.save().await.unwrap();
        assert_eq!(model.id(), Some(id));
        assert_eq!(model.snapshot().unwrap().get_str("username").unwrap(), "renamed");

        let stored = User::find_one(doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored.username, "renamed");
        assert_eq!(stored.age, None);
        assert_eq!(User::count(None).await.unwrap(), 1);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn save_model_with_id_and_no_snapshot_upserts() {
    run(async {
        let mut model = user("test", 10);
        let id = mantle::bson::oid::ObjectId::new();
        model.set_id(Some(id));
        model.save().await.unwrap();
        assert!(model.snapshot().is_some());

        let stored = User::find_one(doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored.username, "test");
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn save_nested_models() {
    run(async {
        let mut author = user("author", 30);
        author.save().await.unwrap();
        let comment = CommentBuilder::default()
            .body("first")
            .created(now())
            .build()
            .unwrap();
        let mut post = PostBuilder::default()
            .title("title")
            .body("body")
            .author(author.clone())
            .comments(vec![comment])
            .build()
            .unwrap();
        post.save().await.unwrap();

        let raw = Post::collection()
            .unwrap()
            .inner()
            .find_one(doc! { "_id": post.id().unwrap() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            raw.get_document("author").unwrap().get_object_id("_id").unwrap(),
            author.id().unwrap()
        );
        assert!(!raw.get_document("author").unwrap().contains_key("id"));

        let stored = Post::find_one(doc! { "_id": post.id().unwrap() }).await.unwrap().unwrap();
        assert_eq!(stored.author.id(), author.id());
        assert_eq!(stored.comments.unwrap()[0].body, "first");
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn create_from_fields() {
    run(async {
        let created = now();
        let model = User::create(&doc! {
            "username": "test",
            "created": mantle::bson::DateTime::from_chrono(created),
            "type": "admin",
        })
        .await
        .unwrap();
        assert!(model.id().is_some());
        assert_eq!(model.kind, UserType::Admin);

        let payload = UserSerializer {
            username: Some("partial".into()),
            created: Some(created),
            age: None,
        };
        let model = User::create(&payload).await.unwrap();
        assert_eq!(model.age, None);
        assert_eq!(User::count(Some(doc! { "username": "partial" })).await.unwrap(), 1);

        let err = User::create(&UserSerializer::default()).await.unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
        assert_eq!(User::count(None).await.unwrap(), 2);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn find_one_without_match() {
    run(async {
        assert!(User::find_one(doc! { "username": "nobody" }).await.unwrap().is_none());
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn bulk_create_and_find() {
    run(async {
        let users = (1..=5).map(|i| user(&format!("test_{i}"), i)).collect::<Vec<_>>();
        let created = User::bulk_create(&users).await.unwrap();
        assert_eq!(created.len(), 5);
        assert!(created.iter().all(|model| model.id().is_some() && model.snapshot().is_some()));
        assert_eq!(User::count(None).await.unwrap(), 5);

        let found = User::find_many(doc! { "username": { "$regex": "[0-3]" } }).await.unwrap();
        assert_eq!(found.len(), 3);

        let streamed = User::find(doc! {})
            .await
            .unwrap()
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(streamed.len(), 5);
        assert!(streamed.iter().all(|model| model.snapshot().is_some()));
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn update_many_returns_updated_models() {
    run(async {
        let users = (1..=5).map(|i| user(&format!("test_{i}"), i)).collect::<Vec<_>>();
        User::bulk_create(&users).await.unwrap();

        let updated = User::update_many(
            doc! { "age": { "$gt": 1, "$lte": 3 } },
            doc! { "$set": { "age": 100 } },
        )
        .await
        .unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|model| model.age == Some(100)));
        assert_eq!(User::count(Some(doc! { "age": 100 })).await.unwrap(), 2);

        let none = User::update_many(doc! { "age": 1000 }, doc! { "$set": { "age": 0 } })
            .await
            .unwrap();
        assert!(none.is_empty());
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn update_model_fields() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();

        model
            .update(&UserSerializer {
                username: Some("updated".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(model.username, "updated");
        assert_eq!(model.age, Some(10));

        let stored = User::find_one(doc! { "_id": model.id().unwrap() }).await.unwrap().unwrap();
        assert_eq!(stored.username, "updated");
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn reload_model() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();
        User::collection()
            .unwrap()
            .inner()
            .update_one(doc! { "_id": model.id().unwrap() }, doc! { "$set": { "age": 42 } })
            .await
            .unwrap();

        model.reload().await.unwrap();
        assert_eq!(model.age, Some(42));
        assert_eq!(model.snapshot().unwrap().get_i32("age").unwrap(), 42);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn delete_model() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();
        assert_eq!(model.delete().await.unwrap(), 1);
        assert!(model.snapshot().is_some_and(|snapshot| snapshot.is_empty()));
        assert_eq!(User::count(None).await.unwrap(), 0);
        assert_eq!(model.delete().await.unwrap(), 0);
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn save_after_delete_does_not_recreate() {
    run(async {
        let mut model = user("test", 10);
        model.save().await.unwrap();
        model.delete().await.unwrap();

        model.age = Some(11);
        model.save().await.unwrap();
        assert_eq!(User::count(None).await.unwrap(), 0);
        assert!(User::find_one(doc! { "id": model.id().unwrap() }).await.unwrap().is_none());
    });
}

#[test]
#[ignore = "requires MONGODB_URL"]
fn filters_by_id() {
    run(async {
        let mut first = user("first", 1);
        first.save().await.unwrap();
        let mut second = user("second", 2);
        second.save().await.unwrap();
        let id = first.id().unwrap();

        let found = User::find_one(doc! { "id": id }).await.unwrap().unwrap();
        assert_eq!(found.username, "first");
        assert_eq!(User::count(Some(doc! { "id": { "$ne": id } })).await.unwrap(), 1);
        assert_eq!(User::count(Some(doc! { "id": null })).await.unwrap(), 0);

        let many = User::find_many(doc! { "id": { "$in": [id, second.id().unwrap()] } })
            .await
            .unwrap();
        assert_eq!(many.len(), 2);

        let updated = User::update_many(doc! { "id": id }, doc! { "$set": { "age": 7 } })
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].age, Some(7));
    });
}
