//! 查询接口：参数校验与分页

use crate::setup::TestEnvironment;
use reqwest::StatusCode;
use serde_json::json;

#[cfg(test)]
mod query_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_invalid_params_are_rejected_by_both_services() {
        let env = TestEnvironment::setup().await.unwrap();

        for query in ["limit=0", "limit=1001", "offset=-1", "sort=random"] {
            for client in [&env.gateway, &env.management] {
                let (status, body) = client.purchases(query).await.unwrap();
                assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
                assert_eq!(body["success"], false);
            }
        }
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_pagination_walk_through_gateway() {
        let env = TestEnvironment::setup().await.unwrap();
        let userid = TestEnvironment::unique_userid();

        for i in 0..5 {
            env.gateway
                .buy(&json!({ "username": "bob", "userid": userid, "price": i }))
                .await
                .unwrap();
        }
        env.wait_for_count(&userid, 5).await.unwrap();

        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let (status, body) = env
                .gateway
                .purchases(&format!("userid={userid}&limit=2&offset={offset}&sort=asc"))
                .await
                .unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["pagination"]["total"], 5);

            let page = body["records"].as_array().unwrap();
            assert!(page.len() <= 2);
            ids.extend(page.iter().map(|r| r["id"].as_i64().unwrap()));
            offset += page.len();

            if !body["pagination"]["hasMore"].as_bool().unwrap() {
                break;
            }
        }

        let stored: Vec<i64> = env
            .db
            .purchases_of(&userid)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, stored);

        env.cleanup(&userid).await;
    }
}
