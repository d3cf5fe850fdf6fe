use oas_conform_core::{
    load_document, AppError, CheckOptions, ConformanceChecker, ExchangeRequest, ExchangeResponse,
    Location, Method, NoMatchError, PathMatcher, Rule, SchemaDocument, SchemaNode,
    SchemaValidator, Segment,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;

const USERS_API: &str = r##"
openapi: 3.0.3
info:
  title: Users
  version: "1.0"
paths:
  /users/me:
    get:
      operationId: currentUser
      responses:
        "200":
          description: the caller
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/User'
  /users/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
          format: int64
    get:
      operationId: getUser
      parameters:
        - name: fields
          in: query
          style: form
          explode: false
          schema:
            type: array
            items:
              type: string
              enum: [name, email, address]
      responses:
        "200":
          description: found
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/User'
        "404":
          description: not found
    post:
      operationId: replaceUser
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name:
                  type: string
      responses:
        "2XX":
          description: stored
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/User'
        default:
          description: problem
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Problem'
components:
  schemas:
    User:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
        name:
          type: string
        nickname:
          type: string
          nullable: true
        email:
          type: string
          format: email
        address:
          $ref: '#/components/schemas/Address'
        contact:
          oneOf:
            - type: object
              required: [phone]
              properties:
                phone:
                  type: string
            - type: object
              required: [email]
              properties:
                email:
                  type: string
    Address:
      type: object
      additionalProperties: false
      required: [street, zip]
      properties:
        street:
          type: string
        zip:
          type: string
    Problem:
      type: object
      required: [title]
      properties:
        title:
          type: string
"##;

fn users_api() -> SchemaDocument {
    load_document(USERS_API).unwrap()
}

fn rules(findings: &oas_conform_core::ValidationReport) -> Vec<Rule> {
    findings.iter().map(|f| f.rule).collect()
}

#[test]
fn test_empty_body_reports_missing_name() {
    let doc = users_api();
    let request = ExchangeRequest::new(Method::Post, "/users/7").with_json_body(&json!({}));
    let report = ConformanceChecker::new(&doc)
        .check_request(&request, &CheckOptions::default())
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.findings()[0].rule, Rule::MissingRequired);
    assert_eq!(report.findings()[0].location.to_string(), "requestBody.name");
    assert_eq!(
        report.describe(),
        "requestBody.name: Required property 'name' must be present in the object"
    );
}

#[test]
fn test_201_selects_range_over_default() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);
    let operation = doc.operation("/users/{id}", Method::Post).unwrap();

    // Valid as a User, invalid as a Problem: only passes if "2XX" is chosen.
    let response = ExchangeResponse::new(201).with_json_body(&json!({"id": 7, "name": "Ada"}));
    assert!(checker
        .check_response(operation, &response, &CheckOptions::default())
        .is_empty());

    // 500 falls through to "default".
    let response = ExchangeResponse::new(500).with_json_body(&json!({"id": 7, "name": "Ada"}));
    let report = checker.check_response(operation, &response, &CheckOptions::default());
    assert_eq!(rules(&report), vec![Rule::MissingRequired]);
    assert_eq!(report.findings()[0].location.to_string(), "responseBody.title");
}

#[test]
fn test_literal_template_wins_with_no_bindings() {
    let doc = users_api();
    let matched = PathMatcher::new(&doc).resolve("/users/me", Method::Get).unwrap();
    assert_eq!(matched.operation.template(), "/users/me");
    assert!(matched.bindings.is_empty());

    let matched = PathMatcher::new(&doc).resolve("/users/42", Method::Get).unwrap();
    assert_eq!(matched.operation.template(), "/users/{id}");
    assert_eq!(matched.bindings["id"], "42");
}

#[test]
fn test_unknown_path_and_method_not_allowed_are_distinct() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);

    let err = checker
        .check_request(&ExchangeRequest::new(Method::Get, "/orders"), &CheckOptions::default())
        .unwrap_err();
    assert!(matches!(err, AppError::NoMatch(NoMatchError::UnknownPath { .. })));

    let err = checker
        .check_request(&ExchangeRequest::new(Method::Delete, "/users/1"), &CheckOptions::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Route Error: DELETE is not allowed on /users/1 (template '/users/{id}' allows GET, POST)"
    );
}

#[test]
fn test_nullable_handling() {
    let components = users_api().components().clone();
    let validator = SchemaValidator::new(&components);
    let root = Location::root();

    let nullable = SchemaNode::string().nullable();
    assert!(validator.validate(&json!(null), &nullable, &root).is_empty());

    let report = validator.validate(&json!(null), &SchemaNode::string(), &root);
    assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
}

#[test]
fn test_one_of_matching_both_branches_is_one_violation() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);
    let operation = doc.operation("/users/{id}", Method::Get).unwrap();

    let response = ExchangeResponse::new(200).with_json_body(&json!({
        "id": 1,
        "name": "Ada",
        "contact": {"phone": "555", "email": "ada@example.com"}
    }));
    let report = checker.check_response(operation, &response, &CheckOptions::default());
    assert_eq!(rules(&report), vec![Rule::CompositionViolation]);
    assert_eq!(report.findings()[0].location.to_string(), "responseBody.contact");
    assert!(report.findings()[0].message.contains("matches 2 schemas"));
}

#[test]
fn test_nested_missing_property_adds_one_segment() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);
    let operation = doc.operation("/users/{id}", Method::Get).unwrap();

    let response = ExchangeResponse::new(200).with_json_body(&json!({
        "id": 1,
        "name": "Ada",
        "address": {"street": "Main St"}
    }));
    let report = checker.check_response(operation, &response, &CheckOptions::default());
    assert_eq!(report.len(), 1);

    let parent = Location::at(Segment::ResponseBody).property("address");
    let finding = &report.findings()[0];
    assert_eq!(finding.rule, Rule::MissingRequired);
    assert_eq!(finding.location.len(), parent.len() + 1);
    assert_eq!(finding.location.segments().last(), Some(&Segment::Property("zip".into())));
    assert_eq!(finding.location.json_pointer(), "/responseBody/address/zip");
}

#[test]
fn test_wrong_property_type_names_both_types() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);
    let operation = doc.operation("/users/me", Method::Get).unwrap();

    let response = ExchangeResponse::new(200).with_json_body(&json!({"id": 1, "name": 123}));
    let report = checker.check_response(operation, &response, &CheckOptions::default());
    assert_eq!(
        report.describe(),
        "responseBody.name: Expected string, got integer"
    );
}

#[test]
fn test_every_violation_in_one_pass() {
    let doc = users_api();
    let checker = ConformanceChecker::new(&doc);
    let request = ExchangeRequest::new(Method::Get, "/users/abc?fields=name,phone");
    let response = ExchangeResponse::new(200).with_json_body(&json!({
        "id": 1,
        "name": "Ada",
        "nickname": null,
        "email": "not-an-email",
        "address": {"street": "Main St", "zip": "12345", "country": "NL"}
    }));

    let report = checker
        .check_exchange(&request, &response, &CheckOptions::default())
        .unwrap();
    assert_eq!(
        report.describe(),
        [
            "parameter:id: Expected integer, got string",
            "parameter:fields[1]: Value \"phone\" is not one of the allowed values [\"name\", \"email\", \"address\"]",
            "responseBody.email: Value \"not-an-email\" is not a valid 'email'",
            "responseBody.address.country: Property 'country' is not defined in the schema and additional properties are not allowed",
        ]
        .join("\n")
    );
}

#[test]
fn test_undocumented_status_code_is_a_finding() {
    let doc = users_api();
    let operation = doc.operation("/users/me", Method::Get).unwrap();
    let report = ConformanceChecker::new(&doc).check_response(
        operation,
        &ExchangeResponse::new(418),
        &CheckOptions::default(),
    );
    assert_eq!(rules(&report), vec![Rule::UndocumentedStatusCode]);
}

#[test]
fn test_disabled_options_skip_content_checks() {
    let doc = users_api();
    let request = ExchangeRequest::new(Method::Post, "/users/x").with_json_body(&json!({}));
    let response = ExchangeResponse::new(418);
    let report = ConformanceChecker::new(&doc)
        .check_exchange(&request, &response, &CheckOptions::disabled())
        .unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_shared_document_across_threads() {
    let doc = Arc::new(users_api());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || {
                let request = ExchangeRequest::new(Method::Post, format!("/users/{}", i))
                    .with_json_body(&json!({"name": i}));
                ConformanceChecker::new(&doc)
                    .check_request(&request, &CheckOptions::default())
                    .unwrap()
                    .len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}

#[test]
fn test_null_against_free_form_property_is_a_type_mismatch() {
    let doc = load_document(
        r#"
openapi: 3.0.3
paths:
  /status:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                properties:
                  meta:
                    description: free-form
                  extra:
                    nullable: true
"#,
    )
    .unwrap();
    let checker = ConformanceChecker::new(&doc);
    let operation = doc.operation("/status", Method::Get).unwrap();

    let response =
        ExchangeResponse::new(200).with_json_body(&json!({"meta": null, "extra": null}));
    let report = checker.check_response(operation, &response, &CheckOptions::default());
    assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
    assert_eq!(report.findings()[0].location.to_string(), "responseBody.meta");

    let response = ExchangeResponse::new(200).with_json_body(&json!({"meta": {"any": [1]}}));
    assert!(checker
        .check_response(operation, &response, &CheckOptions::default())
        .is_empty());
}
