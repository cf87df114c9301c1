/// Column-name constants for the session-metrics schema.
/// Single source of truth - shared by every stage and exported to Python.

// ── Canonical record columns ────────────────────────────────────────────────
pub mod record {
    pub const REGION: &str = "region";
    pub const IGNATOR_ID: &str = "ignator_id";
    pub const STUDENT_ID: &str = "student_id";
    pub const SESSION_ID: &str = "session_id";
    pub const PROGRAM: &str = "program";
    pub const SESSION_DATE: &str = "session_date";
    pub const DA_PRE_SCORE: &str = "da_pre_score";
    pub const DA_POST_SCORE: &str = "da_post_score";
    pub const DA_PRE_DATE: &str = "da_pre_date";
    pub const DA_POST_DATE: &str = "da_post_date";

    pub const ALL: [&str; 10] = [
        REGION,
        IGNATOR_ID,
        STUDENT_ID,
        SESSION_ID,
        PROGRAM,
        SESSION_DATE,
        DA_PRE_SCORE,
        DA_POST_SCORE,
        DA_PRE_DATE,
        DA_POST_DATE,
    ];

    pub const DATES: [&str; 3] = [SESSION_DATE, DA_PRE_DATE, DA_POST_DATE];
}

// ── Derived flag columns ────────────────────────────────────────────────────
pub mod flags {
    pub const IS_EXCLUDED_PROGRAM: &str = "is_excluded_program";
    pub const HAS_PRE: &str = "has_pre";
    pub const HAS_POST: &str = "has_post";
    pub const PREPOST_SAME_DATE: &str = "prepost_same_date";
    pub const VALID_PREPOST_PAIR: &str = "valid_prepost_pair";

    pub const ALL: [&str; 5] = [
        IS_EXCLUDED_PROGRAM,
        HAS_PRE,
        HAS_POST,
        PREPOST_SAME_DATE,
        VALID_PREPOST_PAIR,
    ];
}

// ── Metrics report columns ──────────────────────────────────────────────────
pub mod metrics {
    pub const REGION: &str = "Region";
    pub const UNIQUE_STUDENTS: &str = "Unique Students";
    pub const UNIQUE_IGNATORS: &str = "Unique Ignators";
    pub const SESSION_COUNT: &str = "Session Count (After Exclusion)";
    pub const DA_PRE: &str = "DA-Pre";
    pub const DA_POST: &str = "DA-Post";
    pub const COMPLETION_RATE: &str = "Completion Rate (%)";
    pub const PREPOST_GAP: &str = "DA Pre-to-Post Gap";
    pub const WASTAGE: &str = "% Incomplete DA-Set (Wastage)";
    pub const NO_DA_IGNATOR_COUNT: &str = "Ignators w/eligible sessions but no DA (count)";
    pub const NO_DA_IGNATOR_LIST: &str = "Ignators missing DA (list)";

    pub const ALL: [&str; 11] = [
        REGION,
        UNIQUE_STUDENTS,
        UNIQUE_IGNATORS,
        SESSION_COUNT,
        DA_PRE,
        DA_POST,
        COMPLETION_RATE,
        PREPOST_GAP,
        WASTAGE,
        NO_DA_IGNATOR_COUNT,
        NO_DA_IGNATOR_LIST,
    ];

    /// Region label of the organization-wide row.
    pub const TOTAL: &str = "TOTAL";
}
