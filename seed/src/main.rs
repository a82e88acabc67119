use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

const USERS: [(&str, &str); 5] = [
    ("Ana Garcia", "ana.garcia@example.com"),
    ("Luis Martinez", "luis.martinez@example.com"),
    ("Maria Torres", "maria.torres@example.com"),
    ("Carlos Ruiz", "carlos.ruiz@example.com"),
    ("Elena Diaz", "elena.diaz@example.com"),
];

const COMMENTS: [&str; 15] = [
    "I love this product, it works perfectly and arrived early",
    "Excellent customer service, they solved my problem in minutes",
    "Absolutely fantastic quality, I would buy it again",
    "Great value for money, highly recommended",
    "Amazing experience from start to finish",
    "Terrible quality, it broke after two days",
    "The worst purchase I have made this year",
    "Very disappointed, the support team never answered",
    "Awful packaging and the item was damaged",
    "Poor service and a complete waste of money",
    "It is okay, nothing special but it does the job",
    "Average product, meets the basic needs",
    "Delivery was on time, the product is as described",
    "Not bad, could be better for the price",
    "Decent quality, neither great nor terrible",
];

#[derive(Deserialize, Debug)]
struct User {
    id: i64,
    email: String,
}

#[derive(Deserialize, Debug)]
struct CreatedUser {
    data: User,
}

#[derive(Deserialize, Debug)]
struct UserList {
    users: Vec<User>,
}

#[derive(Deserialize, Debug)]
struct Analysis {
    sentiment: String,
    confidence: f64,
}

#[derive(Deserialize, Debug)]
struct CreatedComment {
    analysis: Analysis,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let api_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let client = Client::new();

    let mut user_ids = Vec::new();
    for (name, email) in USERS {
        match create_user_helper(&client, &api_url, name, email).await {
            Ok(id) => user_ids.push(id),
            Err(e) => warn!("User creation failed for {}: {}", email, e),
        }
    }

    let mut rng = rand::thread_rng();
    for user_id in user_ids {
        let count = rng.gen_range(2..=4);
        let texts: Vec<&str> = COMMENTS.choose_multiple(&mut rng, count).copied().collect();

        for text in texts {
            if let Err(e) = create_comment_helper(&client, &api_url, user_id, text).await {
                warn!("Comment creation failed: {}", e);
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    info!("Seeding finished");
    Ok(())
}

async fn create_user_helper(
    client: &Client,
    api_url: &str,
    name: &str,
    email: &str,
) -> Result<i64, Box<dyn std::error::Error>> {
    debug!("Creating user with name: {}, email: {}", name, email);

    let response = client
        .post(format!("{}/api/users", api_url))
        .json(&json!({ "name": name, "email": email }))
        .send()
        .await?;

    match response.status() {
        StatusCode::CREATED => {
            let created: CreatedUser = response.json().await?;
            info!("User {} created successfully", email);
            Ok(created.data.id)
        }
        StatusCode::BAD_REQUEST => {
            warn!("User with email {} already exists, skipping creation.", email);
            let list: UserList = client
                .get(format!("{}/api/users", api_url))
                .send()
                .await?
                .json()
                .await?;
            list.users
                .into_iter()
                .find(|u| u.email == email)
                .map(|u| u.id)
                .ok_or_else(|| format!("user {} was rejected and does not exist", email).into())
        }
        status => {
            error!("Failed to create user: {}", status);
            Err(format!("unexpected status {}", status).into())
        }
    }
}

async fn create_comment_helper(
    client: &Client,
    api_url: &str,
    user_id: i64,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/comments", api_url))
        .json(&json!({ "user_id": user_id, "text": text }))
        .send()
        .await?;

    if response.status() != StatusCode::CREATED {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("status {}: {}", status, body).into());
    }

    let created: CreatedComment = response.json().await?;
    info!(
        "User {} -> {:?}: {} ({:.2}%)",
        user_id, text, created.analysis.sentiment, created.analysis.confidence
    );
    Ok(())
}
