mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{data, data_str, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::json;

#[tokio::test]
async fn direct_chat_is_reused_and_tracks_unread() {
    let app = TestApp::new().await;
    let designer = app.staff(UserRole::Designer).id();

    let (status, first) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/chats/direct",
            Some(json!({ "user_id": designer })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    let chat_id = data(&first)["chat"]["id"]
        .as_str()
        .expect("chat id")
        .to_string();

    // Opening from the other side lands in the same conversation.
    let sales = app.staff(UserRole::Sales).id();
    let (_, second) = app
        .call(
            UserRole::Designer,
            Method::POST,
            "/api/v1/chats/direct",
            Some(json!({ "user_id": sales })),
        )
        .await;
    assert_eq!(data(&second)["chat"]["id"], chat_id.as_str());
    assert_eq!(
        data(&second)["participant_ids"].as_array().map(Vec::len),
        Some(2)
    );

    for text in ["Proof is ready?", "Customer is waiting"] {
        let (status, sent) = app
            .call(
                UserRole::Sales,
                Method::POST,
                &format!("/api/v1/chats/{chat_id}/messages"),
                Some(json!({ "body": text })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(data(&sent)["kind"], "text");
    }

    let (_, chats) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/chats", None)
        .await;
    assert_eq!(data(&chats)[0]["unread_count"], 2);
    assert_eq!(
        data(&chats)[0]["chat"]["last_message_preview"],
        "Customer is waiting"
    );

    let (status, messages) = app
        .call(
            UserRole::Designer,
            Method::GET,
            &format!("/api/v1/chats/{chat_id}/messages?limit=1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&messages).as_array().map(Vec::len), Some(1));
    assert_eq!(data(&messages)[0]["body"], "Customer is waiting");

    let (status, _) = app
        .call(
            UserRole::Designer,
            Method::POST,
            &format!("/api/v1/chats/{chat_id}/read"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, chats) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/chats", None)
        .await;
    assert_eq!(data(&chats)[0]["unread_count"], 0);

    // Outsiders cannot read the conversation.
    let (status, _) = app
        .call(
            UserRole::Accountant,
            Method::GET,
            &format!("/api/v1/chats/{chat_id}/messages"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn messages_are_validated_and_soft_deleted() {
    let app = TestApp::new().await;
    let printer = app.staff(UserRole::Printing).id();
    let (_, opened) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/chats/direct",
            Some(json!({ "user_id": printer })),
        )
        .await;
    let chat_id = data(&opened)["chat"]["id"]
        .as_str()
        .expect("chat id")
        .to_string();

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/chats/{chat_id}/messages"),
            Some(json!({ "body": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/chats/{chat_id}/messages"),
            Some(json!({ "kind": "voice", "duration_secs": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, sent) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/chats/{chat_id}/messages"),
            Some(json!({ "body": "Wrong chat, sorry" })),
        )
        .await;
    let message_id = data_str(&sent, "id").to_string();

    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::DELETE,
            &format!("/api/v1/chats/{chat_id}/messages/{message_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::DELETE,
            &format!("/api/v1/chats/{chat_id}/messages/{message_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, messages) = app
        .call(
            UserRole::Printing,
            Method::GET,
            &format!("/api/v1/chats/{chat_id}/messages"),
            None,
        )
        .await;
    assert_eq!(data(&messages)[0]["deleted"], true);
    assert!(data(&messages)[0]["body"].is_null());
}

#[tokio::test]
async fn group_chat_needs_other_members() {
    let app = TestApp::new().await;
    let me = app.staff(UserRole::Ceo).id();

    let (status, _) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            "/api/v1/chats/groups",
            Some(json!({ "name": "Just me", "member_ids": [me] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, group) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            "/api/v1/chats/groups",
            Some(json!({
                "name": "Production floor",
                "member_ids": [
                    app.staff(UserRole::Designer).id(),
                    app.staff(UserRole::Printing).id()
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&group)["chat"]["kind"], "group");
    assert_eq!(
        data(&group)["participant_ids"].as_array().map(Vec::len),
        Some(3)
    );
}

#[tokio::test]
async fn call_signaling_lifecycle() {
    let app = TestApp::new().await;
    let designer = app.staff(UserRole::Designer).id();

    let (status, call) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": designer, "offer_sdp": "v=0 offer" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{call}");
    assert_eq!(data(&call)["status"], "ringing");
    let call_id = data_str(&call, "id").to_string();

    // Both parties are busy while the call rings.
    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": designer, "offer_sdp": "v=0 other" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the receiver answers.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/accept"),
            Some(json!({ "answer_sdp": "v=0 answer" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, accepted) = app
        .call(
            UserRole::Designer,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/accept"),
            Some(json!({ "answer_sdp": "v=0 answer" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&accepted)["status"], "ongoing");
    assert_eq!(data(&accepted)["answer_sdp"], "v=0 answer");

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/candidates"),
            Some(json!({ "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host", "sdp_mid": "0", "sdp_mline_index": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Each side only receives the peer's candidates.
    let (_, for_designer) = app
        .call(
            UserRole::Designer,
            Method::GET,
            &format!("/api/v1/calls/{call_id}/candidates"),
            None,
        )
        .await;
    assert_eq!(data(&for_designer).as_array().map(Vec::len), Some(1));
    let (_, for_sales) = app
        .call(
            UserRole::Sales,
            Method::GET,
            &format!("/api/v1/calls/{call_id}/candidates"),
            None,
        )
        .await;
    assert_eq!(data(&for_sales).as_array().map(Vec::len), Some(0));

    let (status, _) = app
        .call(
            UserRole::Accountant,
            Method::GET,
            &format!("/api/v1/calls/{call_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, ended) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/end"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&ended)["status"], "ended");
    assert_eq!(data(&ended)["end_reason"], "hangup");

    let (status, _) = app
        .call(
            UserRole::Designer,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/end"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/calls", None)
        .await;
    assert_eq!(data(&history)["total"], 1);
}

#[tokio::test]
async fn calling_yourself_or_rejecting_is_handled() {
    let app = TestApp::new().await;
    let me = app.staff(UserRole::Sales).id();

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": me, "offer_sdp": "v=0" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, call) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": app.staff(UserRole::Ceo).id(), "offer_sdp": "v=0" })),
        )
        .await;
    let call_id = data_str(&call, "id").to_string();

    let (status, rejected) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/reject"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&rejected)["status"], "rejected");

    // Both parties are free again.
    let (status, _) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": me, "offer_sdp": "v=0" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn unanswered_calls_become_missed() {
    let app = TestApp::new().await;

    let (_, call) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": app.staff(UserRole::Printing).id(), "offer_sdp": "v=0" })),
        )
        .await;
    let call_id = data_str(&call, "id").to_string();

    let expired = app
        .state
        .services
        .calls
        .expire_unanswered(Utc::now() + Duration::minutes(5), Duration::seconds(45))
        .await
        .expect("expire calls");
    assert_eq!(expired, 1);

    let (_, missed) = app
        .call(
            UserRole::Printing,
            Method::GET,
            &format!("/api/v1/calls/{call_id}"),
            None,
        )
        .await;
    assert_eq!(data(&missed)["status"], "missed");
    assert_eq!(data(&missed)["end_reason"], "no_answer");
}

#[tokio::test]
async fn answered_call_survives_a_late_expiry_sweep() {
    let app = TestApp::new().await;
    let printer = app.staff(UserRole::Printing).clone();

    let (_, call) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/calls",
            Some(json!({ "receiver_id": printer.id(), "offer_sdp": "v=0" })),
        )
        .await;
    let call_id = data_str(&call, "id").to_string();

    // The sweep read the call while it was still ringing.
    let ringing = app
        .state
        .services
        .calls
        .get(printer.profile.id, call_id.parse().expect("call id"))
        .await
        .expect("load call");

    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/accept"),
            Some(json!({ "answer_sdp": "v=0 answer" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let missed = app
        .state
        .services
        .calls
        .mark_missed(ringing, Utc::now())
        .await
        .expect("sweep");
    assert!(missed.is_none());

    let (_, current) = app
        .call(
            UserRole::Printing,
            Method::GET,
            &format!("/api/v1/calls/{call_id}"),
            None,
        )
        .await;
    assert_eq!(data(&current)["status"], "ongoing");

    let (status, ended) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/calls/{call_id}/end"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&ended)["end_reason"], "hangup");
}

#[tokio::test]
async fn deleting_the_latest_message_rolls_the_preview_back() {
    let app = TestApp::new().await;
    let printer = app.staff(UserRole::Printing).id();
    let (_, opened) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/chats/direct",
            Some(json!({ "user_id": printer })),
        )
        .await;
    let chat_id = data(&opened)["chat"]["id"]
        .as_str()
        .expect("chat id")
        .to_string();

    let mut ids = Vec::new();
    for body in ["Proofs are ready", "Client card number 4111"] {
        let (status, sent) = app
            .call(
                UserRole::Sales,
                Method::POST,
                &format!("/api/v1/chats/{chat_id}/messages"),
                Some(json!({ "body": body })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{sent}");
        ids.push(data_str(&sent, "id").to_string());
    }

    let preview = |chats: &serde_json::Value| data(chats)[0]["chat"]["last_message_preview"].clone();

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::DELETE,
            &format!("/api/v1/chats/{chat_id}/messages/{}", ids[1]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, chats) = app
        .call(UserRole::Printing, Method::GET, "/api/v1/chats", None)
        .await;
    assert_eq!(preview(&chats), "Proofs are ready");

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::DELETE,
            &format!("/api/v1/chats/{chat_id}/messages/{}", ids[0]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, chats) = app
        .call(UserRole::Printing, Method::GET, "/api/v1/chats", None)
        .await;
    assert!(preview(&chats).is_null());
}
