//! Integration tests for the case session container

mod test_utils;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use echo::cases::models::{CasePhase, LearnerLevel, Role};
    use echo::cases::{CaseSession, StartCaseOptions};
    use echo::client::ApiError;

    use crate::test_utils::{Route, case_response_body, case_state_json, serve_routes, test_client};

    /// A session with a case already started. The returned mock keeps
    /// serving `/case/start` for as long as it's held.
    async fn started_session(server: &mut mockito::Server) -> (CaseSession, mockito::Mock) {
        let start = server
            .mock("POST", "/case/start")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(case_response_body("Hi, I'm 4yo Jane...", "abc", "history"))
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        session
            .start_case(StartCaseOptions::new(LearnerLevel::Student))
            .await
            .unwrap();
        (session, start)
    }

    /// Starting a case seeds the transcript with the tutor's opening
    #[tokio::test]
    async fn it_starts_a_case() {
        let mut server = mockito::Server::new_async().await;
        let start = server
            .mock("POST", "/case/start")
            .match_body(Matcher::Json(json!({
                "learner_level": "student",
                "visit_type": "sick"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(case_response_body("Hi, I'm 4yo Jane...", "abc", "history"))
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        session
            .start_case(StartCaseOptions::new(LearnerLevel::Student))
            .await
            .unwrap();

        start.assert_async().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Tutor);
        assert_eq!(messages[0].content, "Hi, I'm 4yo Jane...");
        assert_eq!(messages[0].phase, CasePhase::History);
        assert_eq!(messages[0].session_id, "abc");

        let case_state = session.case_state().unwrap();
        assert_eq!(case_state.session_id, "abc");
        assert_eq!(case_state.phase, CasePhase::History);
        assert!(!session.is_loading());
        assert!(session.error().is_none());
    }

    /// Requesting a specific condition sends it to the server
    #[tokio::test]
    async fn it_starts_a_case_for_a_condition() {
        let mut server = mockito::Server::new_async().await;
        let start = server
            .mock("POST", "/case/start")
            .match_body(Matcher::PartialJson(json!({
                "learner_level": "resident",
                "condition_key": "bronchiolitis"
            })))
            .with_status(200)
            .with_body(case_response_body("A 3 month old with cough.", "def", "intro"))
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        session
            .start_case(StartCaseOptions::new(LearnerLevel::Resident).condition("bronchiolitis"))
            .await
            .unwrap();

        start.assert_async().await;
        assert_eq!(session.case_state().unwrap().phase, CasePhase::Intro);
    }

    /// A second start replaces the transcript instead of appending
    #[tokio::test]
    async fn it_replaces_the_transcript_on_restart() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;
        session.start_case(StartCaseOptions::default()).await.unwrap();

        assert_eq!(session.messages().len(), 1);
    }

    /// A failed start records the error and clears loading
    #[tokio::test]
    async fn it_records_start_failures() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("POST", "/case/start")
            .with_status(500)
            .with_body(r#"{"detail": "Case generation failed"}"#)
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        let err = session
            .start_case(StartCaseOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Case generation failed");
        assert_eq!(session.error().as_deref(), Some("Case generation failed"));
        assert!(session.case_state().is_none());
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
    }

    /// A successful message adds the learner turn then the tutor turn
    #[tokio::test]
    async fn it_sends_a_message() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let message = server
            .mock("POST", "/case/message")
            .match_body(Matcher::PartialJson(json!({
                "message": "fever for 2 days",
                "case_state": {"session_id": "abc", "phase": "history"}
            })))
            .with_status(200)
            .with_body(case_response_body("How high has it been?", "abc", "exam"))
            .create_async()
            .await;

        session.send_message("fever for 2 days").await.unwrap();
        message.assert_async().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Learner);
        assert_eq!(messages[1].content, "fever for 2 days");
        assert_eq!(messages[1].phase, CasePhase::History);
        assert!(!messages[1].failed);
        assert_eq!(messages[2].role, Role::Tutor);
        assert_eq!(messages[2].content, "How high has it been?");
        assert_eq!(messages[2].phase, CasePhase::Exam);

        // The phase comes from the server's state
        assert_eq!(session.case_state().unwrap().phase, CasePhase::Exam);
        assert!(!session.is_loading());
    }

    /// A failed message stays in the transcript marked failed
    #[tokio::test]
    async fn it_marks_undelivered_messages_failed() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let _message = server
            .mock("POST", "/case/message")
            .with_status(500)
            .create_async()
            .await;

        let result = session.send_message("fever for 2 days").await;
        assert!(result.is_err());

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "fever for 2 days");
        assert_eq!(messages[1].role, Role::Learner);
        assert!(messages[1].failed);

        let error = session.error().unwrap();
        assert!(!error.is_empty());
        assert_eq!(error, "HTTP error 500");

        // State is untouched by the failure
        assert_eq!(session.case_state().unwrap().phase, CasePhase::History);
        assert!(!session.is_loading());

        session.clear_error();
        assert!(session.error().is_none());
        assert_eq!(session.messages().len(), 2);
    }

    /// Teaching moments and hints from the server are exposed
    #[tokio::test]
    async fn it_exposes_teaching_moments() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let body = json!({
            "message": "Think about the ears.",
            "case_state": case_state_json("abc", "exam"),
            "teaching_moment": "Ear pulling is non-specific in toddlers.",
            "hint_offered": true,
            "images": [{
                "key": "bulging_tm",
                "url": "https://example.com/tm.png",
                "caption": "Bulging tympanic membrane",
                "phase": "exam"
            }]
        });
        let _message = server
            .mock("POST", "/case/message")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        session.send_message("I'm not sure").await.unwrap();

        assert_eq!(
            session.teaching_moment().as_deref(),
            Some("Ear pulling is non-specific in toddlers.")
        );
        assert!(session.hint_offered());
        assert_eq!(session.images()[0].key, "bulging_tm");
    }

    /// Ending a case stores the debrief and a closing message
    #[tokio::test]
    async fn it_ends_a_case_with_a_debrief() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let body = json!({
            "message": "Great job working through this case.",
            "case_state": case_state_json("abc", "complete"),
            "debrief": {
                "summary": "Great job working through this case.",
                "strengths": ["Systematic history"],
                "areas_for_improvement": ["Consider hydration"],
                "missed_items": [],
                "teaching_points": ["AOM needs a bulging TM"],
                "follow_up_resources": ["AAP AOM guideline"]
            }
        });
        let debrief = server
            .mock("POST", "/case/debrief")
            .match_body(Matcher::PartialJson(json!({
                "session_id": "abc",
                "phase": "history",
                "patient": {"condition_key": "aom"}
            })))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        session.end_case().await.unwrap();
        debrief.assert_async().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::Tutor);
        assert_eq!(last.phase, CasePhase::Complete);

        let debrief = session.debrief().unwrap();
        assert_eq!(debrief.strengths, vec!["Systematic history"]);
        assert!(session.case_state().unwrap().phase.is_complete());
    }

    /// A failed debrief keeps the case and records the error
    #[tokio::test]
    async fn it_records_debrief_failures() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let _debrief = server
            .mock("POST", "/case/debrief")
            .with_status(502)
            .with_body(r#"{"detail": "Tutor unavailable"}"#)
            .create_async()
            .await;

        assert!(session.end_case().await.is_err());
        assert_eq!(session.error().as_deref(), Some("Tutor unavailable"));
        assert!(session.debrief().is_none());
        assert_eq!(session.messages().len(), 1);
        assert!(session.case_state().is_some());
        assert!(!session.is_loading());
    }

    /// Starting a new case drops the previous debrief
    #[tokio::test]
    async fn it_clears_the_debrief_on_new_case() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let body = json!({
            "message": "Done.",
            "case_state": case_state_json("abc", "complete"),
            "debrief": {"summary": "Done."}
        });
        let _debrief = server
            .mock("POST", "/case/debrief")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;
        session.end_case().await.unwrap();
        assert!(session.debrief().is_some());

        session.start_case(StartCaseOptions::default()).await.unwrap();
        assert!(session.debrief().is_none());
    }

    /// Resetting wipes everything without touching the network
    #[tokio::test]
    async fn it_resets_the_session() {
        let mut server = mockito::Server::new_async().await;
        let (session, _start) = started_session(&mut server).await;

        let _message = server
            .mock("POST", "/case/message")
            .with_status(500)
            .create_async()
            .await;
        let _ = session.send_message("hello").await;
        assert!(session.error().is_some());

        session.reset_case();

        assert!(session.case_state().is_none());
        assert!(session.messages().is_empty());
        assert!(session.error().is_none());
        assert!(session.debrief().is_none());
    }

    /// Resuming rebuilds the transcript from the server conversation
    #[tokio::test]
    async fn it_resumes_a_case() {
        let mut server = mockito::Server::new_async().await;
        let mut case_state = case_state_json("abc", "exam");
        case_state["conversation"] = json!([
            {"role": "echo", "content": "Hi, I'm 4yo Jane..."},
            {"role": "user", "content": "How long has she had a fever?"},
            {"role": "echo", "content": "Two days."}
        ]);
        let body = json!({
            "message": "Two days.",
            "case_state": case_state
        });
        let get = server
            .mock("GET", "/case/abc")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        session.resume_case("abc").await.unwrap();
        get.assert_async().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Learner);
        assert_eq!(messages[2].content, "Two days.");
        assert!(messages.iter().all(|m| m.phase == CasePhase::Exam));
        assert_eq!(session.case_state().unwrap().phase, CasePhase::Exam);
    }

    /// Resuming a case that doesn't exist reports the server's error
    #[tokio::test]
    async fn it_reports_missing_cases_on_resume() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", "/case/missing")
            .with_status(404)
            .with_body(r#"{"detail": "Case not found"}"#)
            .create_async()
            .await;

        let session = CaseSession::new(test_client(&server.url()));
        let err = session.resume_case("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Case not found");
        assert_eq!(session.error().as_deref(), Some("Case not found"));
    }

    /// A session on a scripted server with the case `abc` started
    async fn session_on(routes: Vec<Route>) -> CaseSession {
        let url = serve_routes(routes).await;
        let session = CaseSession::new(test_client(&url));
        session
            .start_case(StartCaseOptions::new(LearnerLevel::Student))
            .await
            .unwrap();
        session
    }

    fn opening_route() -> Route {
        Route::new(
            "/case/start",
            200,
            case_response_body("Hi, I'm 4yo Jane...", "abc", "history"),
        )
    }

    /// A reply that lands after a reset is dropped
    #[tokio::test]
    async fn it_drops_replies_after_reset() {
        let session = session_on(vec![
            opening_route(),
            Route::new(
                "/case/message",
                200,
                case_response_body("How high has it been?", "abc", "exam"),
            )
            .delayed(200),
        ])
        .await;

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("fever for 2 days").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.reset_case();

        pending.await.unwrap().unwrap();

        assert!(session.case_state().is_none());
        assert!(session.messages().is_empty());
        assert!(session.error().is_none());
        assert!(!session.is_loading());
    }

    /// Out of order replies keep the newest state and every reply
    #[tokio::test]
    async fn it_keeps_the_newest_state_when_replies_cross() {
        let session = session_on(vec![
            opening_route(),
            Route::new(
                "/case/message",
                200,
                case_response_body("About 39.", "abc", "history"),
            )
            .matching("temperature")
            .delayed(300),
            Route::new(
                "/case/message",
                200,
                case_response_body("No vomiting.", "abc", "exam"),
            )
            .matching("vomiting"),
        ])
        .await;

        let slow = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("What's her temperature?").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.send_message("Any vomiting?").await.unwrap();
        slow.await.unwrap().unwrap();

        let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(
            contents,
            vec![
                "Hi, I'm 4yo Jane...",
                "What's her temperature?",
                "Any vomiting?",
                "No vomiting.",
                "About 39.",
            ]
        );
        // The slower, older reply doesn't roll the phase back
        assert_eq!(session.case_state().unwrap().phase, CasePhase::Exam);
        assert!(!session.is_loading());
    }

    /// A failed restart leaves the current case in charge, so its
    /// undelivered message is still marked failed
    #[tokio::test]
    async fn it_marks_failed_messages_after_a_failed_restart() {
        let session = session_on(vec![
            Route::new("/case/start", 500, r#"{"detail": "start failed"}"#).matching("bronchiolitis"),
            opening_route(),
            Route::new("/case/message", 500, "").delayed(300),
        ])
        .await;

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("fever for 2 days").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let restart = session
            .start_case(StartCaseOptions::new(LearnerLevel::Student).condition("bronchiolitis"))
            .await;
        assert!(restart.is_err());
        assert!(pending.await.unwrap().is_err());

        assert_eq!(session.case_state().unwrap().session_id, "abc");
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "fever for 2 days");
        assert!(messages[1].failed);
        assert_eq!(session.error().as_deref(), Some("HTTP error 500"));
        assert!(!session.is_loading());
    }

    /// A failed restart doesn't swallow the reply to the current case
    #[tokio::test]
    async fn it_keeps_replies_after_a_failed_restart() {
        let session = session_on(vec![
            Route::new("/case/start", 500, r#"{"detail": "start failed"}"#).matching("bronchiolitis"),
            opening_route(),
            Route::new(
                "/case/message",
                200,
                case_response_body("How high has it been?", "abc", "exam"),
            )
            .delayed(300),
        ])
        .await;

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("fever for 2 days").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let restart = session
            .start_case(StartCaseOptions::new(LearnerLevel::Student).condition("bronchiolitis"))
            .await;
        assert!(restart.is_err());
        pending.await.unwrap().unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "How high has it been?");
        assert_eq!(session.case_state().unwrap().phase, CasePhase::Exam);
    }

    /// A connection dropped mid-request counts as a network failure
    #[tokio::test]
    async fn it_marks_messages_failed_on_network_errors() {
        let session = session_on(vec![opening_route(), Route::hang_up("/case/message")]).await;

        let err = session.send_message("fever for 2 days").await.unwrap_err();

        let api_err = err.downcast_ref::<ApiError>().unwrap();
        assert!(matches!(api_err, ApiError::Network(_)));
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].failed);
        assert!(session.error().unwrap().starts_with("Network error"));
        assert!(!session.is_loading());
    }
}
