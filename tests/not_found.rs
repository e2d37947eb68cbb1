//! The not-found responder is process-wide state: everything touching it lives in this binary,
//! in a single test.
use httpassert::{
    reset_not_found_responder, set_not_found_responder, Expectation, MockServer, ResponseTemplate,
};

#[async_std::test]
async fn the_not_found_responder_can_be_replaced() {
    // Arrange
    let mock_server = MockServer::start("teapot");
    Expectation::new("GET", "/declared").times(1).mount(&mock_server);
    let own_responder = MockServer::builder()
        .name("own")
        .not_found(ResponseTemplate::new(410))
        .start();
    set_not_found_responder(ResponseTemplate::new(418).set_body_string("I'm a teapot"));

    // Act
    let declared = reqwest::get(format!("{}/declared", mock_server.uri()))
        .await
        .unwrap();
    let undeclared = reqwest::get(format!("{}/undeclared", mock_server.uri()))
        .await
        .unwrap();
    let overridden = reqwest::get(own_responder.uri()).await.unwrap();
    reset_not_found_responder();
    let restored = reqwest::get(format!("{}/undeclared", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(declared.status(), 418);
    assert_eq!(undeclared.status(), 418);
    assert_eq!(undeclared.text().await.unwrap(), "I'm a teapot");
    assert_eq!(overridden.status(), 410);
    assert_eq!(restored.status(), 404);

    let mut failures: Vec<String> = Vec::new();
    assert!(!mock_server.assert(&mut failures));
    assert_eq!(
        failures,
        vec!["Server(teapot) got (2) unexpected calls to GET /undeclared"]
    );
}
