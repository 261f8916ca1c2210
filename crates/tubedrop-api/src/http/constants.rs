//! Shared HTTP constants (headers, problem URIs, streaming sizes).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://tubedrop.dev/problems/bad-request";
pub(crate) const PROBLEM_INTERNAL: &str = "https://tubedrop.dev/problems/internal";
pub(crate) const PROBLEM_EXTRACTION_FAILED: &str =
    "https://tubedrop.dev/problems/extraction-failed";
pub(crate) const PROBLEM_ARTIFACT_MISSING: &str = "https://tubedrop.dev/problems/artifact-missing";
pub(crate) const PROBLEM_DELIVERY_FAILED: &str = "https://tubedrop.dev/problems/delivery-failed";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://tubedrop.dev/problems/not-found";

pub(crate) const STREAM_CHUNK_BYTES: usize = 64 * 1024;
pub(crate) const MAX_ATTACHMENT_STEM_CHARS: usize = 180;
