//! # Integration Tests
//!
//! End-to-end tests across crate boundaries:
//! - full pipeline runs (connector -> coordinator -> staging -> compaction
//!   -> query)
//! - cross-crate behavior the per-crate unit tests cannot cover

#[cfg(test)]
mod contract_tests {
    use chrono::{TimeZone, Utc};
    use contracts::{
        staging_path, truncate_to_bucket, BucketKey, EventEnvelope, PointMessage, PointValue,
        StageRecord,
    };
    use std::path::Path;

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    /// The on-disk layout is frozen; any change here breaks existing stores.
    #[test]
    fn test_partition_layout_is_stable() {
        let key = BucketKey {
            tenant_id: "acme".to_string(),
            device_id: "ahu-7".to_string(),
            bucket_start: Utc.with_ymd_and_hms(2024, 5, 1, 12, 15, 0).unwrap(),
        };
        assert_eq!(
            staging_path(Path::new("/data/staging"), &key),
            Path::new(
                "/data/staging/tenant=acme/device=ahu-7/date=2024-05-01/hour=12/telemetry_20240501_1215.jsonl"
            )
        );
    }

    /// Staging lines are frozen too: camelCase fields, RFC 3339 timestamps,
    /// lowercase event type.
    #[test]
    fn test_stage_line_format_is_stable() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();
        let envelope = EventEnvelope::telemetry(
            PointMessage {
                tenant_id: "acme".to_string(),
                building_name: "hq".to_string(),
                space_id: "s1".to_string(),
                device_id: "ahu-7".to_string(),
                point_id: "supply-temp".to_string(),
                sequence: 3,
                occurred_at: at,
                value: PointValue::Number(21.5),
            },
            at,
        );
        let line = envelope.to_stage_record().unwrap().to_line().unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["tenantId"], "acme");
        assert_eq!(json["deviceId"], "ahu-7");
        assert_eq!(json["eventType"], "telemetry");
        assert_eq!(json["occurredAt"], "2024-05-01T12:01:00Z");
        assert_eq!(json["valueJson"], "21.5");

        // And the line round-trips
        let back = StageRecord::from_line(&line).unwrap();
        assert_eq!(back.point_id, "supply-temp");
    }

    #[test]
    fn test_bucket_truncation_examples() {
        let at = |h, m| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();
        assert_eq!(truncate_to_bucket(at(12, 1), 15), at(12, 0));
        assert_eq!(truncate_to_bucket(at(12, 5), 15), at(12, 0));
        assert_eq!(truncate_to_bucket(at(12, 20), 15), at(12, 15));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use contracts::{EventEnvelope, PointMessage, PointValue, QueryConfig, StorageConfig};
    use ingestion::connectors::{SimulatorConfig, SimulatorConnector};
    use ingestion::{CoordinatorConfig, IngestionCoordinator, NullActorClient};
    use query::{QueryEngine, QueryRequest};
    use storage::{ColumnarStorageSink, Compactor, StagingWriter};
    use tokio_util::sync::CancellationToken;

    fn storage_config(root: &Path) -> StorageConfig {
        StorageConfig {
            staging_root: root.join("staging"),
            segment_root: root.join("segments"),
            index_root: root.join("index"),
            bucket_minutes: 15,
            compaction_interval_secs: 5,
        }
    }

    fn request(device: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> QueryRequest {
        QueryRequest {
            tenant_id: "t1".to_string(),
            device_id: device.to_string(),
            from,
            to,
            point_id: None,
            limit: None,
        }
    }

    fn envelope(device: &str, point: &str, minute: u32, sequence: i64) -> EventEnvelope {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        EventEnvelope::telemetry(
            PointMessage {
                tenant_id: "t1".to_string(),
                building_name: "hq".to_string(),
                space_id: "s1".to_string(),
                device_id: device.to_string(),
                point_id: point.to_string(),
                sequence,
                occurred_at: at,
                value: PointValue::Number(20.0 + sequence as f64),
            },
            at,
        )
    }

    /// Simulator -> coordinator -> columnar sink -> compactor -> query.
    ///
    /// Every emitted message must come back out of the query engine exactly
    /// once.
    #[tokio::test]
    async fn test_e2e_ingest_compact_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(dir.path());

        let staging = Arc::new(StagingWriter::new(
            &config.staging_root,
            config.bucket_minutes,
        ));

        let cancel = CancellationToken::new();
        let mut coordinator = IngestionCoordinator::new(
            CoordinatorConfig {
                queue_capacity: 32,
                batch_size: 7,
            },
            NullActorClient,
            cancel,
        );
        coordinator.attach_sink(ColumnarStorageSink::new("columnar", staging), 4);
        coordinator.spawn_connector(SimulatorConnector::new(
            "sim",
            SimulatorConfig {
                tenant_id: "t1".to_string(),
                devices: vec!["d1".to_string(), "d2".to_string()],
                points: vec!["p1".to_string(), "p2".to_string()],
                interval: Duration::from_millis(1),
                max_messages: Some(60),
                ..Default::default()
            },
        ));

        let before = Utc::now();
        coordinator.run().await;

        let report = Compactor::new(&config).run_once().await;
        assert_eq!(report.records_compacted, 60);
        assert_eq!(report.failures, 0);

        let engine = QueryEngine::new(&config, &QueryConfig::default());
        let window_start = before - chrono::Duration::hours(1);
        let window_end = Utc::now() + chrono::Duration::hours(1);

        let d1 = engine
            .execute(&request("d1", window_start, window_end))
            .await
            .unwrap();
        let d2 = engine
            .execute(&request("d2", window_start, window_end))
            .await
            .unwrap();
        assert_eq!(d1.len() + d2.len(), 60);

        // No duplicates: (device, point, sequence) triples are unique
        let mut seen = std::collections::HashSet::new();
        for row in d1.iter().chain(d2.iter()) {
            assert!(seen.insert((row.device_id.clone(), row.point_id.clone(), row.sequence)));
        }

        // Nothing left in staging after compaction
        let leftover = walk_files(&config.staging_root);
        assert!(leftover.is_empty(), "staging not empty: {leftover:?}");
    }

    /// Rows at 12:01 and 12:05 land in the 12:00 bucket, the 12:20 row in
    /// the 12:15 bucket; windows hit exactly the buckets they overlap.
    #[tokio::test]
    async fn test_two_bucket_window_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(dir.path());
        let staging = StagingWriter::new(&config.staging_root, config.bucket_minutes);

        staging
            .write_batch(&[
                envelope("d1", "p1", 1, 0),
                envelope("d1", "p1", 5, 1),
                envelope("d1", "p1", 20, 2),
            ])
            .await
            .unwrap();
        Compactor::new(&config).run_once().await;

        // Two segments were produced
        assert_eq!(walk_files(&config.segment_root).len(), 2);

        let engine = QueryEngine::new(&config, &QueryConfig::default());
        let at = |h, m| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();

        let all = engine
            .execute(&request("d1", at(12, 0), at(12, 30)))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        // Entirely within the gap of the first bucket: pruned to nothing
        let gap = engine
            .execute(&request("d1", at(12, 6), at(12, 15)))
            .await
            .unwrap();
        assert!(gap.is_empty());

        // Covers only the second bucket's row
        let tail = engine
            .execute(&request("d1", at(12, 16), at(12, 30)))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].sequence, 2);
    }

    /// Records staged into an already-compacted bucket replace that bucket's
    /// segment wholesale on the next sweep.
    #[tokio::test]
    async fn test_late_data_restages_and_replaces_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(dir.path());
        let staging = StagingWriter::new(&config.staging_root, config.bucket_minutes);
        let compactor = Compactor::new(&config);
        let engine = QueryEngine::new(&config, &QueryConfig::default());
        let at = |h, m| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();

        staging
            .write_batch(&[envelope("d1", "p1", 1, 0)])
            .await
            .unwrap();
        compactor.run_once().await;
        let rows = engine
            .execute(&request("d1", at(12, 0), at(12, 15)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        // Late arrival for the same bucket
        staging
            .write_batch(&[envelope("d1", "p2", 5, 1)])
            .await
            .unwrap();
        compactor.run_once().await;

        let rows = engine
            .execute(&request("d1", at(12, 0), at(12, 15)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].point_id, "p2");
    }

    /// A limit smaller than the total row count cuts the scan mid-walk and
    /// keeps chronological bucket order.
    #[tokio::test]
    async fn test_limit_spans_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(dir.path());
        let staging = StagingWriter::new(&config.staging_root, config.bucket_minutes);

        // Three buckets: 12:00, 12:15, 12:30
        staging
            .write_batch(&[
                envelope("d1", "p1", 1, 0),
                envelope("d1", "p1", 16, 1),
                envelope("d1", "p1", 17, 2),
                envelope("d1", "p1", 31, 3),
            ])
            .await
            .unwrap();
        Compactor::new(&config).run_once().await;

        let engine = QueryEngine::new(&config, &QueryConfig::default());
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();
        let mut req = request("d1", at(12, 0), at(13, 0));
        req.limit = Some(3);

        let rows = engine.execute(&req).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.sequence).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    /// Config loaded from TOML drives a real staging + compaction round.
    #[tokio::test]
    async fn test_config_driven_storage_roots() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
            [storage]
            staging_root = "{0}/staging"
            segment_root = "{0}/segments"
            index_root = "{0}/index"
            bucket_minutes = 15
            compaction_interval_secs = 2

            [[connectors]]
            name = "sim"
            kind = "simulator"

            [[sinks]]
            name = "columnar"
            kind = "columnar"
            "#,
            dir.path().display()
        );
        let store =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert!(store.connector_enabled("sim"));
        assert!(store.sink_enabled("columnar"));

        let staging = StagingWriter::new(&store.storage.staging_root, store.storage.bucket_minutes);
        staging
            .write_batch(&[envelope("d1", "p1", 1, 0)])
            .await
            .unwrap();
        let report = Compactor::new(&store.storage).run_once().await;
        assert_eq!(report.files_compacted, 1);
        assert!(store.storage.segment_root.exists());
    }

    /// Fan-out delivers identical record counts to parallel sinks.
    #[tokio::test]
    async fn test_fanout_consistency_between_sinks() {
        use contracts::{ContractError, EventSink};
        use std::sync::Mutex;

        #[derive(Clone)]
        struct CountingSink {
            count: Arc<Mutex<u64>>,
        }

        impl EventSink for CountingSink {
            fn name(&self) -> &str {
                "counting"
            }
            async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError> {
                *self.count.lock().unwrap() += batch.len() as u64;
                Ok(())
            }
            async fn flush(&mut self) -> Result<(), ContractError> {
                Ok(())
            }
            async fn close(&mut self) -> Result<(), ContractError> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(dir.path());
        let staging = Arc::new(StagingWriter::new(
            &config.staging_root,
            config.bucket_minutes,
        ));

        let count = Arc::new(Mutex::new(0u64));
        let cancel = CancellationToken::new();
        let mut coordinator = IngestionCoordinator::new(
            CoordinatorConfig {
                queue_capacity: 16,
                batch_size: 5,
            },
            NullActorClient,
            cancel,
        );
        coordinator.attach_sink(ColumnarStorageSink::new("columnar", staging), 4);
        coordinator.attach_sink(
            CountingSink {
                count: Arc::clone(&count),
            },
            4,
        );
        coordinator.spawn_connector(SimulatorConnector::new(
            "sim",
            SimulatorConfig {
                tenant_id: "t1".to_string(),
                interval: Duration::from_millis(1),
                max_messages: Some(23),
                ..Default::default()
            },
        ));
        coordinator.run().await;

        assert_eq!(*count.lock().unwrap(), 23);
        let report = Compactor::new(&config).run_once().await;
        assert_eq!(report.records_compacted, 23);
    }

    fn walk_files(root: &Path) -> Vec<std::path::PathBuf> {
        let mut files = Vec::new();
        if !root.exists() {
            return files;
        }
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files
    }
}
