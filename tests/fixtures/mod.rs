//! Canned backend payloads for integration tests.

use serde_json::{json, Value};

pub const VALID_TOKEN: &str = "token-123";

pub fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

pub fn err(code: &str, message: &str) -> Value {
    json!({ "success": false, "error": { "code": code, "message": message } })
}

pub fn user() -> Value {
    json!({
        "id": 1,
        "email": "jisoo@example.com",
        "name": "Jisoo",
        "gender": "female",
        "profileImageUrl": "/uploads/profile/1.png",
        "preferredTags": null,
        "preferredCoordis": null,
        "hasCompletedOnboarding": true,
        "createdAt": "2025-01-01T00:00:00Z"
    })
}

pub fn closet_items() -> Value {
    json!({
        "items": [
            { "id": 11, "category": "top", "name": "Oxford shirt", "imageUrl": "/img/11.png", "season": "spring" },
            { "id": 12, "category": "bottom", "name": "Wide slacks", "imageUrl": "/img/12.png", "season": "fall" },
            { "id": 13, "category": "outer", "name": "Trench coat", "imageUrl": "/img/13.png", "season": "fall" }
        ],
        "pagination": { "currentPage": 1, "totalPages": 1, "totalItems": 3, "hasNext": false, "hasPrev": false }
    })
}

pub fn job_status(status: &str) -> Value {
    match status {
        "completed" => json!({
            "status": "completed",
            "resultImageUrl": "/results/77.png",
            "llmMessage": "The trench balances the wide slacks."
        }),
        "failed" => json!({ "status": "failed", "error": "person not detected" }),
        other => json!({ "status": other }),
    }
}

pub fn history(job_id: i64, status: &str) -> Value {
    json!({
        "fittings": [{
            "jobId": job_id,
            "status": status,
            "resultImageUrl": null,
            "items": [
                { "itemId": 11, "category": "top", "name": "Oxford shirt" },
                { "itemId": 13, "category": "outer", "name": "Trench coat" }
            ],
            "createdAt": "2025-03-02T10:00:00Z"
        }],
        "pagination": { "currentPage": 1, "totalPages": 1, "totalItems": 1, "hasNext": false, "hasPrev": false }
    })
}
