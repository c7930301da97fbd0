#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;

    use crate::models::{BestSectors, Convention, Driver, DriverTime};
    use crate::test::test_utils::{isolated_backend, setup_test_client, unreachable_backend};

    async fn offline_client() -> Client {
        setup_test_client(unreachable_backend()).await
    }

    async fn assert_bad_request(client: &Client, method: &str, uri: &str) {
        let request = match method {
            "GET" => client.get(uri.to_string()),
            "POST" => client.post(uri.to_string()),
            "PUT" => client.put(uri.to_string()),
            "DELETE" => client.delete(uri.to_string()),
            other => panic!("unsupported method {}", other),
        };
        let response = request.dispatch().await;
        assert_eq!(
            response.status(),
            Status::BadRequest,
            "{} {} should be rejected",
            method,
            uri
        );
    }

    #[rocket::async_test]
    async fn test_health() {
        let client = offline_client().await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "OK");
    }

    #[rocket::async_test]
    async fn test_missing_required_parameters() {
        let client = offline_client().await;

        let response = client.post("/api/driver?email=a%40b.c").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.into_string().await.unwrap(),
            "Invalid input: Missing required parameter: name"
        );

        assert_bad_request(&client, "POST", "/api/driver?name=%20%20").await;
        assert_bad_request(&client, "POST", "/api/convention?location=Belgium").await;
        assert_bad_request(
            &client,
            "POST",
            "/api/drivertime?driver_id=d-1&convention_id=1&sector1=30&sector2=30&sector3=30",
        )
        .await;
    }

    #[rocket::async_test]
    async fn test_malformed_values() {
        let client = offline_client().await;

        let response = client
            .post("/api/convention?name=Spa&date=28-07-2024")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        assert!(
            response
                .into_string()
                .await
                .unwrap()
                .contains("Expected format: YYYY-MM-DD")
        );

        assert_bad_request(
            &client,
            "POST",
            "/api/drivertime?driver_id=d-1&convention_id=one&sector1=30&sector2=30&sector3=30&laptime=90",
        )
        .await;
        assert_bad_request(
            &client,
            "POST",
            "/api/drivertime?driver_id=d-1&convention_id=1&sector1=fast&sector2=30&sector3=30&laptime=90",
        )
        .await;
        assert_bad_request(&client, "GET", "/api/convention/abc").await;
        assert_bad_request(&client, "DELETE", "/api/drivertime/1.5").await;
        assert_bad_request(&client, "GET", "/api/drivertimes?convention_id=spa").await;
    }

    #[rocket::async_test]
    async fn test_list_options_are_checked() {
        let client = offline_client().await;

        assert_bad_request(&client, "GET", "/api/drivers?sort_by=password").await;
        assert_bad_request(&client, "GET", "/api/conventions?sort_by=name&order=sideways").await;
        assert_bad_request(&client, "GET", "/api/drivertimes?limit=-3").await;
        assert_bad_request(&client, "GET", "/api/drivertimes?limit=ten").await;
    }

    #[rocket::async_test]
    async fn test_update_parameters_are_checked() {
        let client = offline_client().await;

        assert_bad_request(&client, "PUT", "/api/driver/d-1/update").await;
        assert_bad_request(&client, "PUT", "/api/driver/d-1/update?created=2020-01-01").await;
        assert_bad_request(&client, "PUT", "/api/driver/d-1/update?name=").await;
        assert_bad_request(&client, "PUT", "/api/convention/1/update?date=tomorrow").await;
        assert_bad_request(&client, "PUT", "/api/drivertime/1/update?laptime=slow").await;
        assert_bad_request(&client, "PUT", "/api/drivertime/1/update?driver=d-2").await;
    }

    #[rocket::async_test]
    async fn test_blank_optional_parameters_are_ignored() {
        let client = offline_client().await;

        // Past validation, so the unreachable database answers.
        for uri in [
            "/api/driver?name=Zed&id=",
            "/api/driver?name=Zed&email=&id=%20",
            "/api/convention?name=Spa&date=",
            "/api/convention?name=Spa&location=&date=%20",
        ] {
            let response = client.post(uri).dispatch().await;
            assert_eq!(
                response.status(),
                Status::ServiceUnavailable,
                "POST {} should reach the database",
                uri
            );
        }

        let response = client
            .get("/api/drivertimes?driver_id=&convention_id=")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
    }

    #[rocket::async_test]
    async fn test_database_outage_is_service_unavailable() {
        let client = offline_client().await;

        let response = client.get("/api/drivers").dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
        assert_eq!(response.into_string().await.unwrap(), "Database unavailable");
    }

    #[rocket::async_test]
    #[ignore = "requires a PostgreSQL server at TEST_DATABASE_URL"]
    async fn test_driver_lifecycle_over_http() {
        let backend = isolated_backend().await.expect("Failed to set up database");
        let client = setup_test_client(backend).await;

        let response = client
            .post("/api/driver?name=Alice&email=alice%40example.com&id=alice")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        assert_eq!(response.content_type(), Some(ContentType::JSON));
        let created: Driver = response.into_json().await.unwrap();
        assert_eq!(created.id, "alice");
        assert_eq!(created.email.as_deref(), Some("alice@example.com"));

        let response = client
            .put("/api/driver/alice/update?email=")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let updated: Driver = response.into_json().await.unwrap();
        assert_eq!(updated.email, None);
        assert_eq!(updated.name, "Alice");

        let response = client.get("/api/driver/alice").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let fetched: Driver = response.into_json().await.unwrap();
        assert_eq!(fetched, updated);

        let response = client.delete("/api/driver/alice/delete").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_string().await.unwrap(),
            "Driver deleted with id: alice"
        );

        let response = client.get("/api/driver/alice").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client.delete("/api/driver/alice/delete").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    #[ignore = "requires a PostgreSQL server at TEST_DATABASE_URL"]
    async fn test_timing_flow_over_http() {
        let backend = isolated_backend().await.expect("Failed to set up database");
        let client = setup_test_client(backend).await;

        let response = client.post("/api/driver?name=Alice&id=alice").dispatch().await;
        assert_eq!(response.status(), Status::Created);

        let response = client
            .post("/api/convention?name=Spa&location=Belgium&date=2024-07-28")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let spa: Convention = response.into_json().await.unwrap();
        assert_eq!(spa.date.map(|d| d.to_string()).as_deref(), Some("2024-07-28"));

        let uri = format!(
            "/api/drivertime?driver_id=alice&convention_id={}&sector1=30.1&sector2=29.8&sector3=31.0&laptime=90.9",
            spa.id
        );
        let response = client.post(uri).dispatch().await;
        assert_eq!(response.status(), Status::Created);
        let time: DriverTime = response.into_json().await.unwrap();
        assert_eq!(time.driver_id, "alice");

        let response = client
            .get("/api/drivertimes/best?driver_id=alice")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let best: BestSectors = response.into_json().await.unwrap();
        assert_eq!(best.best_sector2, Some(29.8));
        assert_eq!(best.best_laptime, Some(90.9));

        let response = client
            .get(format!("/api/drivertimes?convention_id={}&sort_by=laptime&order=desc", spa.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let times: Vec<DriverTime> = response.into_json().await.unwrap();
        assert_eq!(times, vec![time.clone()]);

        let response = client
            .post(format!(
                "/api/drivertime?driver_id=ghost&convention_id={}&sector1=1&sector2=1&sector3=1&laptime=3",
                spa.id
            ))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .delete(format!("/api/drivertime/{}", time.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .delete(format!("/api/convention/{}", spa.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_string().await.unwrap(),
            format!("Convention deleted with id: {}", spa.id)
        );
    }
}
