mod support;

use client::XapiClient;
use protocol::{
    content_hash, ClientError, Condition, ErrorClass, ProfileKey, ProfileOwner, StateKey,
    ValidationError, IF_MATCH, IF_NONE_MATCH,
};
use serde_json::json;
use support::{agent, context, MemoryLrs};

const ACTIVITY: &str = "http://adlnet.gov/expapi/activities/act";

fn client(lrs: &std::sync::Arc<MemoryLrs>) -> XapiClient {
    XapiClient::new(context(), lrs.clone())
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "current_thread")]
async fn if_absent_write_succeeds_once_then_fails_with_412() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = ProfileKey::activity(ACTIVITY, "prof");
    let value = json!({"activityId": ACTIVITY, "profileId": "prof"});
    let condition = Some(Condition::new(IF_NONE_MATCH, "*"));

    client
        .put_profile(key.clone(), value.clone(), condition.clone())
        .await
        .expect("first conditional write should succeed");

    let err = client
        .put_profile(key, value, condition)
        .await
        .expect_err("second conditional write should be rejected");

    assert_eq!(err.class(), ErrorClass::Protocol);
    assert!(err.is_precondition_failed());
    assert_eq!(lrs.request_count(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn concatenated_condition_headers_fail_before_dispatch() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    let err = client
        .put_profile(
            ProfileKey::agent(agent(), "prof"),
            json!({"k": "v"}),
            Some(Condition::new(format!("{IF_NONE_MATCH}{IF_MATCH}"), "*")),
        )
        .await
        .expect_err("should fail");

    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InvalidConditionalHeader { .. })
    ));
    assert_eq!(lrs.request_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn empty_match_value_fails_for_any_document() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    for value in [json!({}), json!({"k": "v"}), json!([1, 2, 3])] {
        for header in [IF_MATCH, IF_NONE_MATCH] {
            let err = client
                .put_profile(
                    ProfileKey::activity(ACTIVITY, "prof"),
                    value.clone(),
                    Some(Condition::new(header, "")),
                )
                .await
                .expect_err("should fail");
            assert_eq!(err, ClientError::Validation(ValidationError::InvalidMatchValue));
        }
    }
    assert_eq!(lrs.request_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn etag_equals_precomputed_content_hash() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = ProfileKey::agent(agent(), "prof");
    let value = json!({"profileId": "prof", "level": 3});

    client
        .put_profile(key.clone(), value.clone(), None)
        .await
        .expect("write should succeed");
    let reply = client.get_profile(key, None).await.expect("read should succeed");

    assert_eq!(reply.response.etag(), Some(content_hash(&value).as_str()));
    assert_eq!(reply.data, Some(value));
}

#[tokio::test(flavor = "current_thread")]
async fn if_match_with_current_tag_succeeds_and_stale_tag_fails() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = ProfileKey::activity(ACTIVITY, "prof");
    let original = json!({"version": 1});
    let updated = json!({"version": 2});

    client
        .put_profile(key.clone(), original.clone(), None)
        .await
        .expect("initial write");

    client
        .put_profile(
            key.clone(),
            updated.clone(),
            Some(Condition::new(IF_MATCH, content_hash(&original))),
        )
        .await
        .expect("write against the current tag should succeed");

    let stale = client
        .put_profile(
            key,
            json!({"version": 3}),
            Some(Condition::new(IF_MATCH, content_hash(&original))),
        )
        .await
        .expect_err("write against a stale tag should fail");
    assert!(stale.is_precondition_failed());
}

#[tokio::test(flavor = "current_thread")]
async fn profile_merge_is_unconditional_and_shallow() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = ProfileKey::activity(ACTIVITY, "prof");

    client
        .post_profile(key.clone(), json!({"a": 1, "nested": {"x": 1}}))
        .await
        .expect("first merge");
    client
        .post_profile(key.clone(), json!({"b": 2, "nested": {"y": 2}}))
        .await
        .expect("second merge");

    let reply = client.get_profile(key, None).await.expect("read");
    assert_eq!(reply.data, Some(json!({"a": 1, "b": 2, "nested": {"y": 2}})));
    assert!(lrs.requests().iter().all(|request| {
        request.header(IF_MATCH).is_none() && request.header(IF_NONE_MATCH).is_none()
    }));
}

#[tokio::test(flavor = "current_thread")]
async fn profile_list_and_delete() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    for id in ["p1", "p2"] {
        client
            .put_profile(ProfileKey::agent(agent(), id), json!({"id": id}), None)
            .await
            .expect("write");
    }
    client
        .delete_profile(ProfileKey::agent(agent(), "p1"))
        .await
        .expect("delete");

    let listed = client
        .get_profile(ProfileKey::list(ProfileOwner::Agent(agent())), None)
        .await
        .expect("list");
    assert_eq!(listed.data, Some(json!(["p2"])));
}

#[tokio::test(flavor = "current_thread")]
async fn profile_writes_require_owner_id_and_value() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    let missing_id = client
        .put_profile(ProfileKey::list(ProfileOwner::Activity(ACTIVITY.into())), json!({}), None)
        .await
        .expect_err("should fail");
    let null_value = client
        .post_profile(ProfileKey::activity(ACTIVITY, "prof"), serde_json::Value::Null)
        .await
        .expect_err("should fail");
    let null_agent = client
        .get_profile(ProfileKey::list(ProfileOwner::Agent(serde_json::Value::Null)), None)
        .await
        .expect_err("should fail");

    for err in [missing_id, null_value, null_agent] {
        assert_eq!(err.class(), ErrorClass::Validation);
    }
    assert_eq!(lrs.request_count(), 0);
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "current_thread")]
async fn state_round_trip_with_registration() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = StateKey::new(ACTIVITY, agent(), "attemptedstate").with_registration("reg-1");
    let value = json!({"info": "the state info"});

    client
        .put_state(key.clone(), value.clone(), None)
        .await
        .expect("write");
    let reply = client.get_state(key.clone(), None).await.expect("read");
    assert_eq!(reply.data, Some(value));

    let other_registration = client
        .get_state(StateKey::new(ACTIVITY, agent(), "attemptedstate"), None)
        .await
        .expect_err("unregistered scope is empty");
    assert_eq!(other_registration.status(), Some(404));

    client.delete_state(key.clone()).await.expect("delete");
    let gone = client.get_state(key, None).await.expect_err("deleted");
    assert_eq!(gone.status(), Some(404));
}

#[tokio::test(flavor = "current_thread")]
async fn state_match_hash_guards_replacement() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = StateKey::new(ACTIVITY, agent(), "s");
    let old = json!({"step": 1});

    client.put_state(key.clone(), old.clone(), None).await.expect("write");
    client
        .put_state(key.clone(), json!({"step": 2}), Some(content_hash(&old)))
        .await
        .expect("matching hash");
    let err = client
        .put_state(key, json!({"step": 3}), Some(content_hash(&old)))
        .await
        .expect_err("stale hash");

    assert!(err.is_precondition_failed());
}

#[tokio::test(flavor = "current_thread")]
async fn state_merge_and_delete_all() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);
    let key = StateKey::new(ACTIVITY, agent(), "s");

    client.post_state(key.clone(), json!({"a": 1})).await.expect("merge");
    client.post_state(key.clone(), json!({"b": 2})).await.expect("merge");
    client
        .post_state(StateKey::new(ACTIVITY, agent(), "t"), json!({"c": 3}))
        .await
        .expect("merge");

    let merged = client.get_state(key, None).await.expect("read");
    assert_eq!(merged.data, Some(json!({"a": 1, "b": 2})));

    let ids = client
        .get_state(StateKey::all(ACTIVITY, agent()), None)
        .await
        .expect("list");
    assert_eq!(ids.data, Some(json!(["s", "t"])));

    client
        .delete_state(StateKey::all(ACTIVITY, agent()))
        .await
        .expect("delete all");
    let ids = client
        .get_state(StateKey::all(ACTIVITY, agent()), None)
        .await
        .expect("list");
    assert_eq!(ids.data, Some(json!([])));
}

#[tokio::test(flavor = "current_thread")]
async fn state_requires_activity_agent_and_valid_since() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    let no_activity = client
        .get_state(StateKey::all("", agent()), None)
        .await
        .expect_err("should fail");
    let no_agent = client
        .get_state(StateKey::all(ACTIVITY, serde_json::Value::Null), None)
        .await
        .expect_err("should fail");
    let no_state_id = client
        .put_state(StateKey::all(ACTIVITY, agent()), json!({}), None)
        .await
        .expect_err("should fail");
    let bad_since = client
        .get_state(StateKey::all(ACTIVITY, agent()), Some("not a time".into()))
        .await
        .expect_err("should fail");

    for err in [no_activity, no_agent, no_state_id] {
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidParameters { .. })
        ));
    }
    assert!(matches!(
        bad_since,
        ClientError::Validation(ValidationError::InvalidTimestamp { .. })
    ));
    assert_eq!(lrs.request_count(), 0);
}

// ---------------------------------------------------------------------------
// Activities, agents, about
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "current_thread")]
async fn lookups_pass_identifiers_through() {
    let lrs = MemoryLrs::new();
    let client = client(&lrs);

    let activity = client.get_activities(ACTIVITY).await.expect("activity");
    assert_eq!(activity.data.expect("data")["id"], json!(ACTIVITY));

    let person = client.get_agents(agent()).await.expect("agent");
    assert_eq!(
        person.data.expect("data")["mbox"],
        json!(["mailto:userone@example.com"])
    );

    let about = client.about().await.expect("about");
    assert_eq!(about.data.expect("data")["version"], json!(["1.0.3"]));

    assert_eq!(lrs.request_count(), 3);
}
