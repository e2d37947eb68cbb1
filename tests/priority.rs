use httpassert::{Expectation, MockServer, ResponseTemplate};

#[async_std::test]
async fn the_first_registered_expectation_wins() {
    // Arrange
    let mock_server = MockServer::start("broad-first");
    let broad = Expectation::new("GET", "/users")
        .times(1)
        .respond_with(ResponseTemplate::new(200));
    let narrow = Expectation::new("GET", "/users/abcd")
        .times(1)
        .respond_with(ResponseTemplate::new(201));
    mock_server.expect(broad);
    mock_server.expect(narrow);

    // Act
    let response = reqwest::get(format!("{}/users/abcd", mock_server.uri()))
        .await
        .unwrap();

    // Assert - the broad prefix shadows the narrow one
    assert_eq!(response.status(), 200);
    let mut failures: Vec<String> = Vec::new();
    assert!(!mock_server.assert(&mut failures));
    assert_eq!(
        failures,
        vec!["Server(broad-first) expected (1) more calls to GET /users/abcd"]
    );
}

#[async_std::test]
async fn registering_the_narrow_prefix_first_avoids_shadowing() {
    // Arrange
    let mock_server = MockServer::start("narrow-first");
    mock_server.expect(
        Expectation::new("GET", "/users/abcd")
            .times(1)
            .respond_with(ResponseTemplate::new(201)),
    );
    mock_server.expect(
        Expectation::new("GET", "/users")
            .times(1)
            .respond_with(ResponseTemplate::new(200)),
    );
    let client = reqwest::Client::new();

    // Act
    let narrow = client
        .get(format!("{}/users/abcd", mock_server.uri()))
        .send()
        .await
        .unwrap();
    let broad = client
        .get(format!("{}/users/efgh", mock_server.uri()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(narrow.status(), 201);
    assert_eq!(broad.status(), 200);
    assert!(mock_server.assert(&mut Vec::<String>::new()));
}

#[async_std::test]
async fn the_method_must_match_as_well_as_the_prefix() {
    // Arrange
    let mock_server = MockServer::start("methods");
    mock_server.expect(
        Expectation::new("POST", "/items")
            .times(1)
            .respond_with(ResponseTemplate::new(201)),
    );
    mock_server.expect(
        Expectation::new("GET", "/items")
            .times(1)
            .respond_with(ResponseTemplate::new(200)),
    );
    let client = reqwest::Client::new();

    // Act
    let get = client
        .get(format!("{}/items", mock_server.uri()))
        .send()
        .await
        .unwrap();
    let post = client
        .post(format!("{}/items", mock_server.uri()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(get.status(), 200);
    assert_eq!(post.status(), 201);
    assert!(mock_server.assert(&mut Vec::<String>::new()));
}

#[async_std::test]
async fn expectations_registered_after_an_unexpected_call_are_shadowed_by_it() {
    // Arrange
    let mock_server = MockServer::start("late");
    let url = format!("{}/late", mock_server.uri());

    // Act - the first call is unexpected, the synthetic expectation comes first from now on
    let early = reqwest::get(&url).await.unwrap();
    mock_server.expect(
        Expectation::new("GET", "/late")
            .times(1)
            .respond_with(ResponseTemplate::new(200)),
    );
    let late = reqwest::get(&url).await.unwrap();

    // Assert
    assert_eq!(early.status(), 404);
    assert_eq!(late.status(), 404);
    let mut failures: Vec<String> = Vec::new();
    assert!(!mock_server.assert(&mut failures));
    assert_eq!(
        failures,
        vec![
            "Server(late) got (2) unexpected calls to GET /late",
            "Server(late) expected (1) more calls to GET /late",
        ]
    );
}
