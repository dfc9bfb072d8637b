pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    ai_service::AiService, course_service::CourseService, payment_service::PaymentService,
    reward_service::RewardService, submission_service::SubmissionService,
    test_service::TestService, user_service::UserService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ai_service: AiService,
    pub course_service: CourseService,
    pub test_service: TestService,
    pub submission_service: SubmissionService,
    pub reward_service: RewardService,
    pub payment_service: PaymentService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        let ai_service = AiService::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.ai_model.clone(),
            Duration::from_secs(config.ai_timeout_secs),
            http_client,
        );

        Self {
            pool: pool.clone(),
            ai_service,
            course_service: CourseService::new(pool.clone()),
            test_service: TestService::new(pool.clone()),
            submission_service: SubmissionService::new(pool.clone()),
            reward_service: RewardService::new(pool.clone()),
            payment_service: PaymentService::new(pool.clone()),
            user_service: UserService::new(pool),
        }
    }
}
