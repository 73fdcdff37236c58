//! County workflow.
//!
//! A county authenticates, establishes its audit board, and then works
//! through two file-upload phases (ballot manifest, then CVR export), each
//! of which can fail at upload, hash verification, or parsing and loop
//! back for a retry. Both uploads can also land too late, which is a dead
//! end for the county's audit. Once both files are parsed the county's
//! audit runs until it is closed out.
//!
//! Upload, hash-check, and parse events carry their outcome as a payload,
//! so each (state, event) pair maps to exactly one target state while the
//! same trigger still produces distinct outcome states.

use crate::engine::{Machine, WorkflowDefinition};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// States of the county workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountyState {
	Initial,
	Authenticated,
	AuditBoardEstablished,
	ManifestUploadSuccessful,
	ManifestTooLate,
	ManifestInterrupted,
	ManifestFileTypeWrong,
	ManifestCheckingHash,
	ManifestHashWrong,
	ManifestHashVerified,
	ManifestParsingData,
	ManifestDataParsed,
	CvrsUploadSuccessful,
	CvrsTooLate,
	CvrsInterrupted,
	CvrsFileTypeWrong,
	CvrsCheckingHash,
	CvrsHashWrong,
	CvrsHashVerified,
	CvrsParsingData,
	CvrsDataParsed,
	AuditUnderway,
	AuditComplete,
}

/// The immediate outcome of a file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadOutcome {
	Successful,
	TooLate,
	Interrupted,
	FileTypeWrong,
}

/// The outcome of verifying an uploaded file's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashOutcome {
	Verified,
	Wrong,
}

/// The outcome of parsing an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseOutcome {
	Parsed,
	FileTypeWrong,
}

/// Events of the county workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountyEvent {
	AuthenticateCountyAdministrator,
	EstablishAuditBoard,
	UploadBallotManifest(UploadOutcome),
	UploadCvrs(UploadOutcome),
	HashChecked(HashOutcome),
	ParseFinished(ParseOutcome),
	Retry,
	Advance,
	StartAudit,
	Refresh,
	CloseOut,
}

static DEFINITION: Lazy<WorkflowDefinition<CountyState, CountyEvent>> = Lazy::new(|| {
	use CountyEvent::*;
	use CountyState::*;
	WorkflowDefinition::new(
		"county-dashboard",
		Initial,
		&[AuditComplete, ManifestTooLate, CvrsTooLate],
		vec![
			(Initial, AuthenticateCountyAdministrator, Authenticated),
			(Authenticated, EstablishAuditBoard, AuditBoardEstablished),
			// Ballot manifest upload phase.
			(
				AuditBoardEstablished,
				UploadBallotManifest(UploadOutcome::Successful),
				ManifestUploadSuccessful,
			),
			(
				AuditBoardEstablished,
				UploadBallotManifest(UploadOutcome::TooLate),
				ManifestTooLate,
			),
			(
				AuditBoardEstablished,
				UploadBallotManifest(UploadOutcome::Interrupted),
				ManifestInterrupted,
			),
			(
				AuditBoardEstablished,
				UploadBallotManifest(UploadOutcome::FileTypeWrong),
				ManifestFileTypeWrong,
			),
			(ManifestInterrupted, Retry, AuditBoardEstablished),
			(ManifestFileTypeWrong, Retry, AuditBoardEstablished),
			(ManifestUploadSuccessful, Advance, ManifestCheckingHash),
			(
				ManifestCheckingHash,
				HashChecked(HashOutcome::Wrong),
				ManifestHashWrong,
			),
			(
				ManifestCheckingHash,
				HashChecked(HashOutcome::Verified),
				ManifestHashVerified,
			),
			(ManifestHashWrong, Retry, AuditBoardEstablished),
			(ManifestHashVerified, Advance, ManifestParsingData),
			(
				ManifestParsingData,
				ParseFinished(ParseOutcome::FileTypeWrong),
				ManifestFileTypeWrong,
			),
			(
				ManifestParsingData,
				ParseFinished(ParseOutcome::Parsed),
				ManifestDataParsed,
			),
			// CVR export upload phase.
			(
				ManifestDataParsed,
				UploadCvrs(UploadOutcome::Successful),
				CvrsUploadSuccessful,
			),
			(ManifestDataParsed, UploadCvrs(UploadOutcome::TooLate), CvrsTooLate),
			(
				ManifestDataParsed,
				UploadCvrs(UploadOutcome::Interrupted),
				CvrsInterrupted,
			),
			(
				ManifestDataParsed,
				UploadCvrs(UploadOutcome::FileTypeWrong),
				CvrsFileTypeWrong,
			),
			(CvrsInterrupted, Retry, ManifestDataParsed),
			(CvrsFileTypeWrong, Retry, ManifestDataParsed),
			(CvrsUploadSuccessful, Advance, CvrsCheckingHash),
			(CvrsCheckingHash, HashChecked(HashOutcome::Wrong), CvrsHashWrong),
			(
				CvrsCheckingHash,
				HashChecked(HashOutcome::Verified),
				CvrsHashVerified,
			),
			(CvrsHashWrong, Retry, ManifestDataParsed),
			(CvrsHashVerified, Advance, CvrsParsingData),
			(
				CvrsParsingData,
				ParseFinished(ParseOutcome::FileTypeWrong),
				CvrsFileTypeWrong,
			),
			(CvrsParsingData, ParseFinished(ParseOutcome::Parsed), CvrsDataParsed),
			// Audit phase.
			(CvrsDataParsed, StartAudit, AuditUnderway),
			(AuditUnderway, Refresh, AuditUnderway),
			(AuditUnderway, CloseOut, AuditComplete),
		],
	)
});

/// A county machine instance.
pub type CountyMachine = Machine<CountyState, CountyEvent>;

/// The workflow definition, shared process-wide.
pub fn definition() -> &'static WorkflowDefinition<CountyState, CountyEvent> {
	&DEFINITION
}

/// A fresh machine in the initial state.
pub fn machine() -> CountyMachine {
	Machine::new(definition())
}
