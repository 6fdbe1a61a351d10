// tests/api_tests.rs

use quiz_portal::{bootstrap::seed_admin_user, config::Config, routes, state::AppState};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    address: String,
    client: Client,
}

fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused/for-memory-store".to_string()),
        "JWT_SECRET" => Some("test_secret_for_integration_tests".to_string()),
        "JWT_EXPIRATION" => Some("600".to_string()),
        "RUST_LOG" => Some("error".to_string()),
        "ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_string()),
        "ADMIN_PASSWORD" => Some(ADMIN_PASSWORD.to_string()),
        "OPERATOR_EMAILS" => Some("ops@example.com, support@example.com".to_string()),
        _ => None,
    })
    .expect("test config should parse")
}

/// Spawns the app over the in-memory store on a random port.
async fn spawn_app() -> TestApp {
    let config = test_config();
    let state = AppState::in_memory(config.clone());

    seed_admin_user(state.users.as_ref(), &config)
        .await
        .expect("Failed to seed admin");

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn register(&self, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": "password123",
                "display_name": "Test Student",
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a student and returns (user id, token).
    async fn student(&self, email: &str) -> (i64, String) {
        let response = self.register(email).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let user: Value = response.json().await.unwrap();
        let token = self.login(email, "password123").await;
        (user["id"].as_i64().unwrap(), token)
    }

    async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Failed to execute request")
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.send(reqwest::Method::GET, path, token, None).await
    }

    /// Creates a faculty and subject and imports `count` questions.
    /// Question i has correct answer "right i".
    async fn subject_with_questions(&self, admin: &str, count: usize) -> i64 {
        let faculty: Value = self
            .post("/api/admin/faculties", admin, json!({ "name": "Engineering" }))
            .await
            .json()
            .await
            .unwrap();

        let response = self
            .post(
                "/api/admin/subjects",
                admin,
                json!({ "name": "Thermodynamics", "faculty_id": faculty["id"] }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let subject: Value = response.json().await.unwrap();
        let subject_id = subject["id"].as_i64().unwrap();

        if count > 0 {
            let rows: Vec<Value> = (0..count)
                .map(|i| {
                    json!({
                        "questionText": format!("Question {}", i),
                        "answer1": format!("wrong a {}", i),
                        "answer2": format!("right {}", i),
                        "answer3": format!("wrong b {}", i),
                        "answer4": format!("wrong c {}", i),
                        "correctIndex": 2,
                        "explanation": "Because.",
                    })
                })
                .collect();

            let response = self
                .post(
                    &format!("/api/admin/subjects/{}/import", subject_id),
                    admin,
                    json!({ "rows": rows }),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let summary: Value = response.json().await.unwrap();
            assert_eq!(summary["imported"], count as u64);
        }

        subject_id
    }

    async fn grant(&self, admin: &str, user_id: i64, plan: &str, days: Option<i64>) {
        let response = self
            .send(
                reqwest::Method::PUT,
                &format!("/api/admin/users/{}/subscription", user_id),
                admin,
                Some(json!({ "plan": plan, "days": days })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_and_login() {
    let app = spawn_app().await;

    let response = app.register("Student@Example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["email"], "student@example.com");
    assert_eq!(user["role"], "student");
    assert_eq!(user["subscription_plan"], "free");
    assert!(user.get("password").is_none());

    let duplicate = app.register("student@example.com").await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let wrong = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "student@example.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let token = app.login("student@example.com", "password123").await;
    let me: Value = app.get("/api/me", &token).await.json().await.unwrap();
    assert_eq!(me["email"], "student@example.com");
    assert_eq!(me["can_take_tests"], false);
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = spawn_app().await;
    let response = app.register("not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/me")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (_, token) = app.student("s@example.com").await;
    let response = app.get("/api/admin/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unentitled_student_cannot_start() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 4).await;
    let (_, token) = app.student("free@example.com").await;

    let response = app
        .post(
            "/api/attempts",
            &token,
            json!({ "subject_id": subject_id, "mode": "PRACTICE" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "subscription_required");
}

#[tokio::test]
async fn operator_bypasses_subscription() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 2).await;
    let (_, token) = app.student("OPS@example.com").await;

    let me: Value = app.get("/api/me", &token).await.json().await.unwrap();
    assert_eq!(me["can_take_tests"], true);

    let response = app
        .post(
            "/api/attempts",
            &token,
            json!({ "subject_id": subject_id, "mode": "PRACTICE" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn revoked_subscription_applies_immediately() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 2).await;
    let (user_id, token) = app.student("sub@example.com").await;
    let start = json!({ "subject_id": subject_id, "mode": "PRACTICE" });

    app.grant(&admin, user_id, "monthly", Some(30)).await;
    let response = app.post("/api/attempts", &token, start.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same token, new store state.
    app.grant(&admin, user_id, "free", None).await;
    let response = app.post("/api/attempts", &token, start).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn paid_grant_requires_days() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (user_id, _) = app.student("nodays@example.com").await;

    let response = app
        .send(
            reqwest::Method::PUT,
            &format!("/api/admin/users/{}/subscription", user_id),
            &admin,
            Some(json!({ "plan": "yearly" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_practice_attempt() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 4).await;
    let (user_id, token) = app.student("learner@example.com").await;
    app.grant(&admin, user_id, "monthly", Some(30)).await;

    let response = app
        .post(
            "/api/attempts",
            &token,
            json!({ "subject_id": subject_id, "mode": "PRACTICE" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mut view: Value = response.json().await.unwrap();
    let attempt_id = view["attempt_id"].as_str().unwrap().to_string();
    assert_eq!(view["total_questions"], 4);
    assert_eq!(view["mode"], "PRACTICE");
    assert!(view["remaining_seconds"].is_null());
    assert!(view["question"].get("correct_index").is_none());

    // Three right, the last one wrong.
    for step in 0..4 {
        let question = &view["question"];
        let answers = question["answers"].as_array().unwrap();
        let right = answers
            .iter()
            .position(|a| a.as_str().unwrap().starts_with("right"))
            .unwrap();
        let choice = if step < 3 { right } else { (right + 1) % 4 };

        let response = app
            .send(
                reqwest::Method::PUT,
                &format!("/api/attempts/{}/answers", attempt_id),
                &token,
                Some(json!({ "question_id": question["id"], "choice": choice })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        if step < 3 {
            view = app
                .post(&format!("/api/attempts/{}/advance", attempt_id), &token, json!({}))
                .await
                .json()
                .await
                .unwrap();
        }
    }

    let review = app
        .get(&format!("/api/attempts/{}/review", attempt_id), &token)
        .await;
    assert_eq!(review.status(), StatusCode::CONFLICT);

    let finish_path = format!("/api/attempts/{}/finish", attempt_id);
    let first: Value = app.post(&finish_path, &token, json!({})).await.json().await.unwrap();
    assert_eq!(first["correct_count"], 3);
    assert_eq!(first["total_questions"], 4);
    assert_eq!(first["score"], 75);
    assert_eq!(first["mode"], "PRACTICE");
    assert_eq!(first["saved"], true);

    let second: Value = app.post(&finish_path, &token, json!({})).await.json().await.unwrap();
    assert_eq!(first, second);

    let review: Value = app
        .get(&format!("/api/attempts/{}/review", attempt_id), &token)
        .await
        .json()
        .await
        .unwrap();
    let items = review.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items.iter().filter(|i| i["is_correct"] == true).count(), 3);
    assert_eq!(items[0]["explanation"], "Because.");

    let results: Value = app.get("/api/results", &token).await.json().await.unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["score"], 75);

    let stats: Value = app.get("/api/results/stats", &token).await.json().await.unwrap();
    assert_eq!(stats["attempts"], 1);
    assert_eq!(stats["average_score"], 75);
    assert_eq!(stats["by_mode"]["PRACTICE"], 1);
    assert_eq!(stats["by_subject"][0]["subject_id"], subject_id);

    let admin_view: Value = app
        .get(&format!("/api/admin/users/{}/results", user_id), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(admin_view.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn timed_attempt_caps_bank_and_locks_navigation() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 30).await;

    let view: Value = app
        .post(
            "/api/attempts",
            &admin,
            json!({ "subject_id": subject_id, "mode": "TRAINING" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = view["attempt_id"].as_str().unwrap();

    assert_eq!(view["total_questions"], 25);
    assert_eq!(view["remaining_seconds"], 1500);

    let view: Value = app
        .post(&format!("/api/attempts/{}/goto", attempt_id), &admin, json!({ "index": 10 }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["position"], 0);

    let response = app
        .send(
            reqwest::Method::DELETE,
            &format!("/api/attempts/{}", attempt_id),
            &admin,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/attempts/{}", attempt_id), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_subject_reports_empty_bank() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 0).await;

    let response = app
        .post(
            "/api/attempts",
            &admin,
            json!({ "subject_id": subject_id, "mode": "PRACTICE" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "empty_bank");
}

#[tokio::test]
async fn attempts_are_private() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 3).await;

    let view: Value = app
        .post(
            "/api/attempts",
            &admin,
            json!({ "subject_id": subject_id, "mode": "PRACTICE" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = view["attempt_id"].as_str().unwrap();

    let (_, other) = app.student("other@example.com").await;
    let response = app.get(&format!("/api/attempts/{}", attempt_id), &other).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_import_stores_nothing() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 0).await;

    let response = app
        .post(
            &format!("/api/admin/subjects/{}/import", subject_id),
            &admin,
            json!({
                "rows": [
                    {
                        "questionText": "Fine row",
                        "answer1": "a", "answer2": "b", "answer3": "c", "answer4": "d",
                        "correctIndex": 1
                    },
                    {
                        "questionText": "Broken row",
                        "answer1": "a", "answer2": "b", "answer3": "c", "answer4": "d",
                        "correctIndex": 5
                    }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("row 2"));

    let subject: Value = app
        .client
        .get(app.url(&format!("/api/subjects/{}", subject_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(subject["question_count"], 0);
}

#[tokio::test]
async fn admin_question_crud_sanitizes_html() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let subject_id = app.subject_with_questions(&admin, 0).await;

    let response = app
        .post(
            &format!("/api/admin/subjects/{}/questions", subject_id),
            &admin,
            json!({
                "text": "<b>Bold</b><script>alert(1)</script>",
                "correct_answer": "yes",
                "wrong_answer1": "no",
                "wrong_answer2": "maybe",
                "wrong_answer3": "never",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let question: Value = response.json().await.unwrap();
    assert_eq!(question["text"], "<b>Bold</b>");

    let response = app
        .send(
            reqwest::Method::PUT,
            &format!("/api/admin/questions/{}", question["id"]),
            &admin,
            Some(json!({ "correct_answer": "absolutely" })),
        )
        .await;
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["correct_answer"], "absolutely");
    assert_eq!(updated["wrong_answer1"], "no");

    let listed: Value = app
        .get(&format!("/api/admin/subjects/{}/questions", subject_id), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .send(
            reqwest::Method::DELETE,
            &format!("/api/admin/questions/{}", question["id"]),
            &admin,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
