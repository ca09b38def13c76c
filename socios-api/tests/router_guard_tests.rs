/// Request guard tests
///
/// Every request here is rejected by the session layer or by input checks
/// before a query runs, so the router is built over a pool that never
/// connects and no database is needed.

mod common;

use axum::http::StatusCode;
use common::{guard_app, send, token_for, TEST_SECRET};
use serde_json::json;
use socios_shared::{
    auth::jwt::{create_token, Claims, TokenType},
    models::user::UserRole,
};
use uuid::Uuid;

fn staff_token() -> String {
    token_for(Uuid::new_v4(), UserRole::User)
}

fn admin_token() -> String {
    token_for(Uuid::new_v4(), UserRole::Admin)
}

#[tokio::test]
async fn test_session_required() {
    let app = guard_app();

    for (method, uri) in [
        ("GET", "/v1/members"),
        ("POST", "/v1/members"),
        ("GET", "/v1/payments"),
        ("DELETE", "/v1/payments/00000000-0000-0000-0000-000000000000"),
        ("GET", "/v1/settings"),
        ("PUT", "/v1/settings"),
        ("GET", "/v1/dashboard/stats"),
        ("GET", "/v1/users/me"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_invalid_tokens_rejected() {
    let app = guard_app();

    let (status, _) = send(&app, "GET", "/v1/members", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let refresh = create_token(
        &Claims::new(Uuid::new_v4(), UserRole::Admin, TokenType::Refresh),
        TEST_SECRET,
    )
    .unwrap();
    let (status, _) = send(&app, "GET", "/v1/members", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = create_token(
        &Claims::new(Uuid::new_v4(), UserRole::Admin, TokenType::Access),
        "another-secret-key-at-least-32-bytes-long",
    )
    .unwrap();
    let (status, _) = send(&app, "GET", "/v1/members", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settings_update_requires_admin() {
    let app = guard_app();

    let (status, body) = send(
        &app,
        "PUT",
        "/v1/settings",
        Some(&staff_token()),
        Some(json!({ "membership_value": "60.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Apenas administradores podem alterar configurações"
    );
}

#[tokio::test]
async fn test_settings_ranges_checked() {
    let app = guard_app();

    for body in [
        json!({ "payment_due_day_of_month": 40 }),
        json!({ "payment_due_day_of_month": 0 }),
        json!({ "reminder_days_before_due": 32 }),
        json!({ "membership_value": 0 }),
        json!({ "membership_value": "100000000000" }),
        json!({ "membership_value": "79.999" }),
    ] {
        let (status, _) = send(
            &app,
            "PUT",
            "/v1/settings",
            Some(&admin_token()),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_member_input_checked() {
    let app = guard_app();
    let token = staff_token();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/members",
        Some(&token),
        Some(json!({
            "name": "Maria Souza",
            "cpf": "529.982.247-24",
            "birth_date": "1990-03-12",
            "phone": "(11) 98765-4321"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "CPF inválido");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/members",
        Some(&token),
        Some(json!({ "name": "Maria Souza" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Nome, CPF, data de nascimento e telefone são obrigatórios"
    );

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/members/00000000-0000-0000-0000-000000000000",
        Some(&token),
        Some(json!({ "phone": "1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/members",
        Some(&token),
        Some(json!({
            "name": "Maria Souza",
            "cpf": "529.982.247-25",
            "birth_date": "1990-03-12",
            "phone": "+55 (11) 98765-4321 1234567890"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Telefone deve ter no máximo 20 dígitos");
}

#[tokio::test]
async fn test_payment_input_checked() {
    let app = guard_app();
    let token = staff_token();

    let base = json!({
        "member_id": Uuid::new_v4(),
        "amount": "50.00",
        "method": "PIX",
        "reference_month": 13,
        "reference_year": 2025,
        "due_date": "2025-06-10"
    });

    let (status, _) = send(&app, "POST", "/v1/payments", Some(&token), Some(base.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut missing = base.clone();
    missing["reference_month"] = json!(6);
    missing.as_object_mut().unwrap().remove("amount");
    let (status, body) = send(&app, "POST", "/v1/payments", Some(&token), Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Campos obrigatórios faltando");

    for amount in ["100000000000", "50.005"] {
        let mut oversized = base.clone();
        oversized["reference_month"] = json!(6);
        oversized["amount"] = json!(amount);
        let (status, body) =
            send(&app, "POST", "/v1/payments", Some(&token), Some(oversized)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert_eq!(
            body["message"],
            "Valor deve ter até duas casas decimais e no máximo 99.999.999,99"
        );
    }

    let (status, _) = send(&app, "GET", "/v1/payments?month=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/v1/payments?status=PAGO", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests() {
    let app = guard_app();
    let token = staff_token();

    let (status, body) = send(&app, "GET", "/v1/members/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Identificador inválido");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/payments",
        Some(&token),
        Some(json!({ "amount": "muito" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_public_endpoints_check_input() {
    let app = guard_app();

    let (status, _) = send(&app, "POST", "/v1/auth/login", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/setup",
        None,
        Some(json!({ "name": "Admin", "email": "admin@clube.com.br", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_security_headers_on_errors() {
    let app = guard_app();

    let response = {
        use axum::{body::Body, http::Request};
        use tower::ServiceExt;

        app.oneshot(
            Request::builder()
                .uri("/v1/members")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
}
