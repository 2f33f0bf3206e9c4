// Narration lines appended to the event log

use crate::verification::VerificationMode;

pub const READY: &str =
    "Ready. Ask me to verify your annual KYC or issue your Life Certificate.";
pub const GREETING: &str = "Hello! What would you like me to do?";
pub const CUSTOMER_REQUEST: &str = "Verify my annual KYC and issue life certificate.";
pub const MODE_PROMPT: &str =
    "Do you want to proceed with Video KYC or Biometrics at agent location?";
pub const INITIATING: &str = "Initiating verification sequence...";
pub const VIDEO_CAPTURE: &str = "Capturing live video & facescan (simulated)...";
pub const BIOMETRICS_CAPTURE: &str = "Reading fingerprint/IRIS if present (simulated)...";
pub const VERIFIED: &str =
    "Verification successful. Updating the benefits platform and issuing life certificate...";
pub const SUSPICIOUS: &str =
    "Verification produced suspicious signals. Asking follow-up questions...";
pub const ANSWERS_SUBMITTED: &str = "Submitted follow-up answers.";
pub const RERUNNING: &str = "Re-running verification with additional inputs...";
pub const CLEARED: &str = "Additional information cleared the suspicious flags. \
     Verification successful. Updating the benefits platform.";
pub const STILL_UNRESOLVED: &str = "Verification still unsuccessful. Please visit a \
     pension office for in-person verification. Notifying office staff...";
pub const STAFF_ALERTED: &str = "Office staff alerted for manual follow-up.";
pub const VISIT_REQUESTED: &str = "I will visit a pension office for in-person verification.";
pub const OFFICES_NOTIFIED: &str = "Pension offices notified for follow-up.";
pub const CERTIFICATE_DOWNLOADED: &str = "Life Certificate downloaded (JSON).";

pub fn mode_choice(mode: VerificationMode) -> &'static str {
    match mode {
        VerificationMode::Remote => "I'll do Video KYC (remote).",
        VerificationMode::AgentLocation => "I'll use biometrics at the agent location.",
    }
}
