//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use docvault::audit::{AuditAction, MemoryAuditSink};
use docvault::blob::MemoryBlobStore;
use docvault::document::{DocumentService, Envelope, NewDocument, NewVersion};
use docvault::store::MemoryStore;
use docvault::types::{ActorRef, OrganizationId};

pub type Service = DocumentService<MemoryStore, MemoryBlobStore>;

pub fn service() -> (Service, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    let service = DocumentService::new(MemoryStore::new(), MemoryBlobStore::new(), sink.clone());
    (service, sink)
}

pub fn actor(name: &str) -> ActorRef {
    ActorRef::new(name)
}

pub fn new_document(title: &str) -> NewDocument {
    NewDocument {
        organization_id: OrganizationId::new(),
        title: title.to_string(),
        ..NewDocument::default()
    }
}

pub fn create(service: &Service, title: &str) -> Envelope {
    service.create(&actor("author"), new_document(title)).unwrap()
}

pub fn version(file_name: &str, content: &[u8]) -> NewVersion {
    NewVersion {
        file_name: file_name.to_string(),
        content_type: "application/pdf".to_string(),
        content: content.to_vec(),
        change_summary: None,
    }
}

pub fn actions(sink: &MemoryAuditSink) -> Vec<AuditAction> {
    sink.events().iter().map(|e| e.action).collect()
}
