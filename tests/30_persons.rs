mod common;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn person_lifecycle_is_owner_scoped() -> Result<()> {
    let Some(db) = common::test_database().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let owner = common::seed_user(&db, "owner", &["user"]).await?;
    let stranger = common::seed_user(&db, "stranger", &["user"]).await?;
    let owner_token = common::bearer(server, &owner).await?;
    let stranger_token = common::bearer(server, &stranger).await?;

    // Create
    let res = client
        .post(server.url("/api/v1/persons"))
        .bearer_auth(&owner_token)
        .json(&json!({ "firstName": "Grace", "lastName": "Hopper", "birthday": "1906-12-09", "businessFlag": "N" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let person = &created["data"];
    let id = person["id"].as_i64().expect("person id");
    assert_eq!(person["firstName"], "Grace");
    assert_eq!(person["birthday"], "1906-12-09");
    assert_eq!(person["userId"], owner.id);

    // Another user's person reads as missing and cannot be changed
    let res = client
        .get(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&stranger_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&stranger_token)
        .json(&json!({ "firstName": "Mallory" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Partial update keeps the untouched fields
    let res = client
        .put(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&owner_token)
        .json(&json!({ "lastName": "Murray Hopper" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;
    assert_eq!(updated["data"]["firstName"], "Grace");
    assert_eq!(updated["data"]["lastName"], "Murray Hopper");
    assert_eq!(updated["data"]["birthday"], "1906-12-09");

    // Search finds it for the owner only
    let res = client
        .get(server.url("/api/v1/persons/search?q=murray"))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    let found: Value = res.json().await?;
    assert_eq!(found["data"]["total"], 1);

    let res = client
        .get(server.url("/api/v1/persons/search?q=murray"))
        .bearer_auth(&stranger_token)
        .send()
        .await?;
    let found: Value = res.json().await?;
    assert_eq!(found["data"]["total"], 0);

    // Soft delete hides the row unless show_inactive is requested
    let res = client
        .delete(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(server.url(&format!("/api/v1/persons/{}?show_inactive=true", id)))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let inactive: Value = res.json().await?;
    assert_eq!(inactive["data"]["activeFlag"], "N");

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn list_total_ignores_the_page_window() -> Result<()> {
    let Some(db) = common::test_database().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let owner = common::seed_user(&db, "pager", &["user"]).await?;
    let token = common::bearer(server, &owner).await?;

    for n in 0..3 {
        let res = client
            .post(server.url("/api/v1/persons"))
            .bearer_auth(&token)
            .json(&json!({ "firstName": format!("P{}", n), "lastName": "Paged" }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let page: Value = client
        .get(server.url("/api/v1/persons?limit=2&offset=0"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["items"].as_array().map(Vec::len), Some(2));

    let beyond: Value = client
        .get(server.url("/api/v1/persons?limit=2&offset=10"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(beyond["data"]["total"], 3);
    assert_eq!(beyond["data"]["items"].as_array().map(Vec::len), Some(0));

    let res = client
        .get(server.url("/api/v1/persons?limit=-1"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn update_advances_modify_date() -> Result<()> {
    let Some(db) = common::test_database().await? else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let owner = common::seed_user(&db, "auditor", &["user"]).await?;
    let token = common::bearer(server, &owner).await?;

    let created: Value = client
        .post(server.url("/api/v1/persons"))
        .bearer_auth(&token)
        .json(&json!({ "firstName": "Ada", "lastName": "Lovelace" }))
        .send()
        .await?
        .json()
        .await?;
    let id = created["data"]["id"].as_i64().expect("person id");
    let created_at = timestamp(&created["data"]["createDate"])?;
    let first_modified = timestamp(&created["data"]["modifyDate"])?;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let res = client
        .put(server.url(&format!("/api/v1/persons/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "lastName": "King" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;

    assert!(timestamp(&updated["data"]["modifyDate"])? > first_modified);
    assert_eq!(timestamp(&updated["data"]["createDate"])?, created_at);
    assert_eq!(updated["data"]["modifyUser"], owner.username.as_str());

    db.close().await;
    Ok(())
}

fn timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let raw = value.as_str().context("timestamp is not a string")?;
    Ok(raw.parse()?)
}
