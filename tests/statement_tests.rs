//! Tests for prepared statement execution
//!
//! These run against the scripted engine in `common` and check both the
//! results handed back and the requests that reached the engine.

mod common;

use std::io::Cursor;

use chrono::{FixedOffset, NaiveDate};
use common::{open, TestEngine, SESSION_ID};
use sqlbridge::types::ZonedTimestamp;
use sqlbridge::{
    Blob, ColumnInfo, Error, LobData, LobHandle, LobKind, ParameterInfo, ParameterMode,
    ParameterType, PreparedDescriptor, Request, Response, RowSet, SqlType, SqlValue,
    StatementReturnType, UpdateResult,
};

const SELECT_SQL: &str = "SELECT * FROM T WHERE ID = ?";
const UPDATE_SQL: &str = "UPDATE T SET V = ? WHERE ID = ?";
const INSERT_SQL: &str = "INSERT INTO T (ID, V) VALUES (?, ?)";
const LOB_SQL: &str = "INSERT INTO DOCS (ID, BODY) VALUES (?, ?)";
const CALL_SQL: &str = "CALL ADD_ONE(?, ?)";

fn columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("ID", SqlType::Integer),
        ColumnInfo::new("V", SqlType::VarChar),
    ]
}

fn rows(count: i64) -> RowSet {
    RowSet::new(
        columns(),
        (1..=count)
            .map(|i| vec![SqlValue::Integer(i), SqlValue::Char(format!("v{}", i))])
            .collect(),
    )
}

fn engine() -> TestEngine {
    TestEngine::new()
        .with_statement(
            SELECT_SQL,
            PreparedDescriptor::rows(1, columns(), vec![ParameterInfo::input(SqlType::Integer)]),
        )
        .with_result(1, Response::Rows(rows(1)))
        .with_statement(
            UPDATE_SQL,
            PreparedDescriptor::count(
                2,
                vec![
                    ParameterInfo::input(SqlType::VarChar),
                    ParameterInfo::input(SqlType::Integer),
                ],
            ),
        )
        .with_result(2, Response::UpdateCount(UpdateResult::count(3)))
        .with_statement(
            INSERT_SQL,
            PreparedDescriptor::count(
                3,
                vec![
                    ParameterInfo::input(SqlType::Integer),
                    ParameterInfo::input(SqlType::VarChar),
                ],
            ),
        )
        .with_statement(
            LOB_SQL,
            PreparedDescriptor::count(
                4,
                vec![
                    ParameterInfo::input(SqlType::Integer),
                    ParameterInfo::input(SqlType::Blob),
                ],
            ),
        )
        .with_statement(
            CALL_SQL,
            PreparedDescriptor::count(
                5,
                vec![
                    ParameterInfo::input(SqlType::Integer).with_name("N"),
                    ParameterInfo::new(ParameterType::new(SqlType::Integer), ParameterMode::Out)
                        .with_name("RESULT"),
                ],
            ),
        )
        .with_result(
            5,
            Response::UpdateCount(UpdateResult {
                count: 0,
                generated_keys: None,
                output_parameters: vec![SqlValue::Null, SqlValue::Integer(42)],
            }),
        )
}

fn executed_parameters(request: &Request) -> Vec<SqlValue> {
    match request {
        Request::Execute(execute) => execute.parameters.clone(),
        other => panic!("expected execute request, got {:?}", other),
    }
}

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_query_returns_rows_and_rejects_update() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 42).await.unwrap();

        assert!(stmt.execute().await.unwrap());
        let mut rs = stmt.result_set().await.unwrap().expect("rows");
        assert!(rs.next().unwrap());
        assert_eq!(rs.get(1).unwrap().as_i64(), Some(1));

        let err = stmt.execute_update().await.unwrap_err();
        assert!(matches!(
            err,
            Error::WrongResultShape {
                expected: "update count",
                actual: "rows"
            }
        ));
    }

    #[tokio::test]
    async fn test_update_returns_count_and_rejects_query() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(UPDATE_SQL).await.unwrap();
        stmt.set_string(1, "x").await.unwrap();
        stmt.set_i32(2, 7).await.unwrap();

        assert_eq!(stmt.execute_update().await.unwrap(), 3);
        assert!(matches!(
            stmt.execute_query().await,
            Err(Error::WrongResultShape { .. })
        ));

        let log = log.lock();
        let executes = log.requests_of("execute");
        assert_eq!(executes.len(), 1);
        assert_eq!(
            executed_parameters(executes[0]),
            vec![SqlValue::Char("x".to_string()), SqlValue::Integer(7)]
        );
    }

    #[tokio::test]
    async fn test_batch_of_two_rows() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(INSERT_SQL).await.unwrap();

        stmt.set_i32(1, 1).await.unwrap();
        stmt.set_string(2, "one").await.unwrap();
        stmt.add_batch().await.unwrap();
        stmt.set_i32(1, 2).await.unwrap();
        stmt.set_string(2, "two").await.unwrap();
        stmt.add_batch().await.unwrap();
        assert_eq!(stmt.batch_len().await, 2);

        assert_eq!(stmt.execute_batch().await.unwrap(), vec![1, 1]);
        assert_eq!(stmt.batch_len().await, 0);

        let log = log.lock();
        match log.requests_of("execute_batch")[0] {
            Request::ExecuteBatch(batch) => {
                assert_eq!(batch.rows.len(), 2);
                assert_eq!(batch.rows[1][1], SqlValue::Char("two".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unset_parameter_fails_before_engine_contact() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(UPDATE_SQL).await.unwrap();
        stmt.set_string(1, "x").await.unwrap();
        let before = log.lock().interactions();

        assert!(matches!(
            stmt.execute().await,
            Err(Error::ParameterNotSet { index: 2 })
        ));
        assert_eq!(log.lock().interactions(), before);
    }
}

mod binding_tests {
    use super::*;

    #[tokio::test]
    async fn test_index_out_of_range_in_any_state() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(UPDATE_SQL).await.unwrap();

        assert!(matches!(
            stmt.set_i32(0, 1).await,
            Err(Error::IndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(matches!(
            stmt.set_i32(3, 1).await,
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));

        stmt.close().await.unwrap();
        assert!(matches!(
            stmt.set_i32(3, 1).await,
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(stmt.set_i32(1, 1).await, Err(Error::StatementClosed)));
    }

    #[tokio::test]
    async fn test_invalid_value_keeps_previous_binding() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 5).await.unwrap();

        assert!(matches!(
            stmt.set_string(1, "not a number").await,
            Err(Error::InvalidValueForType { .. })
        ));
        assert!(stmt.is_parameter_set(1).await);
        assert!(stmt.execute().await.unwrap());
    }

    #[tokio::test]
    async fn test_plain_values_survive_execution() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(UPDATE_SQL).await.unwrap();
        stmt.set_string(1, "x").await.unwrap();
        stmt.set_i64(2, 9).await.unwrap();

        stmt.execute_update().await.unwrap();
        stmt.execute_update().await.unwrap();

        let log = log.lock();
        let executes = log.requests_of("execute");
        assert_eq!(executes.len(), 2);
        assert_eq!(executed_parameters(executes[0]), executed_parameters(executes[1]));
    }

    #[tokio::test]
    async fn test_clear_parameters() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 5).await.unwrap();
        stmt.clear_parameters().await.unwrap();

        assert!(!stmt.is_parameter_set(1).await);
        assert!(matches!(
            stmt.execute_query().await,
            Err(Error::ParameterNotSet { index: 1 })
        ));
    }

    #[tokio::test]
    async fn test_timestamp_shifted_from_supplied_zone() {
        let sql = "INSERT INTO EVENTS (AT) VALUES (?)";
        let engine = TestEngine::new().with_statement(
            sql,
            PreparedDescriptor::count(9, vec![ParameterInfo::input(SqlType::Timestamp)]),
        );
        let (conn, log) = open(engine).await;
        let stmt = conn.prepare_statement(sql).await.unwrap();

        let noon = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        stmt.set_timestamp(1, noon, Some(plus_two)).await.unwrap();
        stmt.execute_update().await.unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        let log = log.lock();
        assert_eq!(
            executed_parameters(log.requests_of("execute")[0]),
            vec![SqlValue::Timestamp(ZonedTimestamp::local(expected))]
        );
    }

    #[tokio::test]
    async fn test_unsupported_setters() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        assert!(matches!(stmt.set_url(1, "http://x").await, Err(Error::Unsupported(_))));
        assert!(matches!(stmt.set_array(1, Vec::new()).await, Err(Error::Unsupported(_))));
        assert!(matches!(stmt.set_row_id(1, &[1]).await, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_output_parameters() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(CALL_SQL).await.unwrap();

        assert!(matches!(
            stmt.set_i32(2, 1).await,
            Err(Error::ParameterModeViolation { index: 2, .. })
        ));
        assert!(matches!(
            stmt.output_parameter(2).await,
            Err(Error::InvalidState(_))
        ));

        stmt.set_i32(1, 41).await.unwrap();
        stmt.execute().await.unwrap();
        assert_eq!(stmt.output_parameter(2).await.unwrap(), SqlValue::Integer(42));
        assert!(matches!(
            stmt.output_parameter(1).await,
            Err(Error::ParameterModeViolation { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_named_parameters() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(CALL_SQL).await.unwrap();

        assert_eq!(stmt.find_parameter_index("result").unwrap(), 2);
        assert!(matches!(
            stmt.find_parameter_index("MISSING"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            stmt.set_parameter_by_name("RESULT", 1).await,
            Err(Error::ParameterModeViolation { index: 2, .. })
        ));

        stmt.set_parameter_by_name("n", 41).await.unwrap();
        stmt.execute().await.unwrap();
        assert_eq!(
            executed_parameters(log.lock().requests_of("execute")[0])[0],
            SqlValue::Integer(41)
        );
        assert_eq!(
            stmt.output_parameter_by_name("RESULT").await.unwrap(),
            SqlValue::Integer(42)
        );
    }

    #[tokio::test]
    async fn test_register_out_parameter() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(CALL_SQL).await.unwrap();

        stmt.register_out_parameter(2, SqlType::BigInt).await.unwrap();
        stmt.register_out_parameter_by_name("RESULT", SqlType::VarChar)
            .await
            .unwrap();
        assert!(matches!(
            stmt.register_out_parameter(1, SqlType::Integer).await,
            Err(Error::ParameterModeViolation { index: 1, .. })
        ));
        assert!(matches!(
            stmt.register_out_parameter(2, SqlType::Date).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            stmt.register_out_parameter(3, SqlType::Integer).await,
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));
    }
}

mod lob_tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_is_staged_and_consumed() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(LOB_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        stmt.set_binary_stream(2, Cursor::new(vec![1u8, 2, 3, 4]), Some(4))
            .await
            .unwrap();

        assert_eq!(stmt.execute_update().await.unwrap(), 1);
        {
            let log = log.lock();
            assert_eq!(log.lobs.len(), 1);
            assert_eq!(log.lobs[0].data, LobData::Bytes(vec![1u8, 2, 3, 4].into()));
            assert!(log.calls.contains(&"create_blob 4".to_string()));
            match &executed_parameters(log.requests_of("execute")[0])[1] {
                SqlValue::Blob(handle) => assert_eq!(handle.length, 4),
                other => panic!("expected blob handle, got {:?}", other),
            }
        }

        // Streams must be supplied again
        assert!(matches!(
            stmt.execute_update().await,
            Err(Error::ParameterNotSet { index: 2 })
        ));
    }

    #[tokio::test]
    async fn test_short_stream_fails_without_execute() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(LOB_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        stmt.set_binary_stream(2, Cursor::new(vec![1u8, 2]), Some(4))
            .await
            .unwrap();

        assert!(matches!(
            stmt.execute_update().await,
            Err(Error::StreamLengthMismatch {
                index: 2,
                declared: 4,
                actual: 2
            })
        ));
        assert!(log.lock().requests_of("execute").is_empty());
    }

    #[tokio::test]
    async fn test_local_blob_created_before_execute() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(LOB_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        stmt.set_blob(2, Blob::Local(vec![9u8; 16].into())).await.unwrap();

        stmt.execute_update().await.unwrap();
        stmt.execute_update().await.unwrap();

        // In-memory content stays bound and is created again per execution
        let log = log.lock();
        assert_eq!(log.lobs.len(), 2);
        assert!(log.lobs.iter().all(|lob| lob.data.len() == 16));
    }

    #[tokio::test]
    async fn test_foreign_blob_rejected() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(LOB_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        let foreign = LobHandle::new(5, SESSION_ID + 1, 3, LobKind::Binary);
        stmt.set_blob(2, Blob::Remote(foreign)).await.unwrap();

        assert!(matches!(
            stmt.execute_update().await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(log.lock().requests_of("execute").is_empty());
    }

    #[tokio::test]
    async fn test_connection_created_blob_passes_through() {
        let (conn, log) = open(engine()).await;
        let blob = conn.create_blob(8).await.unwrap();
        let handle = *blob.handle().unwrap();

        let stmt = conn.prepare_statement(LOB_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        stmt.set_blob(2, blob).await.unwrap();
        stmt.execute_update().await.unwrap();

        let log = log.lock();
        assert!(log.lobs.is_empty());
        assert_eq!(
            executed_parameters(log.requests_of("execute")[0])[1],
            SqlValue::Blob(handle)
        );
    }
}

mod batch_tests {
    use super::*;

    async fn add_rows(stmt: &sqlbridge::PreparedStatement, count: i32) {
        for i in 0..count {
            stmt.set_i32(1, i).await.unwrap();
            stmt.set_string(2, format!("row{}", i)).await.unwrap();
            stmt.add_batch().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_batch_failure_reports_partial_counts() {
        let (conn, _log) = open(engine().fail_batch_at(1)).await;
        let stmt = conn.prepare_statement(INSERT_SQL).await.unwrap();
        add_rows(&stmt, 3).await;

        let err = stmt.execute_batch().await.unwrap_err();
        assert_eq!(err.batch_counts(), Some(&[1u64][..]));
        assert_eq!(err.sql_state(), "23505");
        assert_eq!(stmt.batch_len().await, 0);
    }

    #[tokio::test]
    async fn test_batch_requires_all_parameters() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(INSERT_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        assert!(matches!(
            stmt.add_batch().await,
            Err(Error::ParameterNotSet { index: 2 })
        ));
        assert_eq!(stmt.batch_len().await, 0);
    }

    #[tokio::test]
    async fn test_single_execute_rejected_while_batching() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(INSERT_SQL).await.unwrap();
        add_rows(&stmt, 1).await;

        assert!(matches!(stmt.execute().await, Err(Error::InvalidState(_))));
        stmt.clear_batch().await.unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(INSERT_SQL).await.unwrap();
        assert!(matches!(
            stmt.execute_batch().await,
            Err(Error::InvalidState(_))
        ));
        assert!(log.lock().requests_of("execute_batch").is_empty());
    }
}

mod result_tests {
    use super::*;

    #[tokio::test]
    async fn test_max_rows_caps_result() {
        let sql = "SELECT * FROM T";
        let engine = TestEngine::new()
            .with_statement(sql, PreparedDescriptor::rows(11, columns(), Vec::new()))
            .with_result(11, Response::Rows(rows(10)));
        let (conn, log) = open(engine).await;
        let stmt = conn.prepare_statement(sql).await.unwrap();
        stmt.set_max_rows(3).await.unwrap();

        let rs = stmt.execute_query().await.unwrap();
        assert_eq!(rs.len(), 3);

        match log.lock().requests_of("execute")[0] {
            Request::Execute(execute) => assert_eq!(execute.max_rows, 3),
            other => panic!("unexpected {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_metadata_available_before_execution() {
        let (conn, log) = open(engine()).await;
        let query = conn.prepare_statement(SELECT_SQL).await.unwrap();
        let update = conn.prepare_statement(UPDATE_SQL).await.unwrap();
        let before = log.lock().interactions();

        let metadata = query.metadata().unwrap().expect("row metadata");
        assert_eq!(metadata.column_count(), 2);
        assert_eq!(metadata.column_name(2).unwrap(), "V");
        assert_eq!(query.return_type(), StatementReturnType::Rows);

        assert!(update.metadata().unwrap().is_none());
        assert_eq!(update.parameter_metadata().unwrap().parameter_count(), 2);
        assert_eq!(log.lock().interactions(), before);
    }

    #[tokio::test]
    async fn test_result_set_taken_once() {
        let (conn, _log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();
        stmt.execute().await.unwrap();

        assert!(stmt.result_set().await.unwrap().is_some());
        assert!(stmt.result_set().await.unwrap().is_none());
        assert_eq!(stmt.update_count().await.unwrap(), None);
    }
}

mod lifecycle_tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    #[tokio::test]
    async fn test_close_twice_frees_once() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();

        stmt.close().await.unwrap();
        stmt.close().await.unwrap();
        assert!(stmt.is_closed());
        assert_eq!(log.lock().requests_of("free_statement").len(), 1);
        assert!(matches!(stmt.execute().await, Err(Error::StatementClosed)));
    }

    #[tokio::test]
    async fn test_statement_after_connection_close() {
        let (conn, log) = open(engine()).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        conn.close().await.unwrap();

        assert!(matches!(stmt.set_i32(1, 1).await, Err(Error::SessionClosed)));
        stmt.close().await.unwrap();
        assert!(log.lock().requests_of("free_statement").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_waits_for_running_execute() {
        let (conn, log) = open(engine().execute_delay(Duration::from_secs(5))).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();

        let start = Instant::now();
        let (executed, closed_at) = tokio::join!(stmt.execute(), async {
            sleep(Duration::from_millis(1)).await;
            conn.close().await.unwrap();
            Instant::now()
        });

        assert!(executed.unwrap());
        assert!(closed_at - start >= Duration::from_secs(5));
        assert!(log.lock().closed);
        assert!(matches!(stmt.execute().await, Err(Error::SessionClosed)));
        assert_eq!(log.lock().requests_of("execute").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_queued_behind_close_fails() {
        let (conn, log) = open(engine().ping_delay(Duration::from_secs(5))).await;
        let stmt = conn.prepare_statement(SELECT_SQL).await.unwrap();
        stmt.set_i32(1, 1).await.unwrap();

        let (valid, executed, closed) = tokio::join!(
            conn.is_valid(Duration::ZERO),
            async {
                sleep(Duration::from_millis(1)).await;
                stmt.execute().await
            },
            async {
                sleep(Duration::from_millis(2)).await;
                conn.close().await
            },
        );

        assert!(valid);
        assert!(matches!(executed, Err(Error::SessionClosed)));
        closed.unwrap();
        assert!(log.lock().requests_of("execute").is_empty());
        assert!(log.lock().closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_validity_check_then_close() {
        let (conn, log) = open(engine().ping_delay(Duration::from_secs(5))).await;

        let (valid, closed) = tokio::join!(conn.is_valid(Duration::from_secs(1)), async {
            sleep(Duration::from_millis(10)).await;
            conn.close().await
        });

        assert!(!valid);
        closed.unwrap();
        assert!(conn.is_closed());
        assert!(log.lock().closed);
        assert!(!conn.is_valid(Duration::ZERO).await);
        assert_eq!(log.lock().requests_of("ping").len(), 1);
    }
}
