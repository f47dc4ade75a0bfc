//! User-facing reply texts.

pub const NOTHING_RUNNING: &str = "Hiện không có quy trình nào đang chạy.";
pub const LOST_CONTEXT: &str = "Em chưa có thông tin về quy trình trước đó.";
pub const TASK_COMPLETED: &str = "Công việc đã hoàn tất. Anh/chị cần hỗ trợ gì thêm không?";
pub const NOTHING_TO_REWIND: &str = "Không có bước nào để quay lại.";
pub const AT_FIRST_STEP: &str = "Đang ở bước đầu tiên, anh/chị hãy tiếp tục nhé.";
pub const NOTHING_TO_CANCEL: &str = "Hiện không có quy trình nào để huỷ.";
pub const TASK_CANCELLED: &str = "Em đã huỷ quy trình hiện tại. Anh/chị cần gì thêm cứ nói nhé.";
pub const NOTHING_TO_RESUME: &str = "Không còn quy trình nào để quay lại.";
pub const RESUME_DECLINED: &str = "Dạ vâng, nếu cần hỗ trợ thêm anh/chị cứ nói nhé.";
pub const VERSION_DATA_MISSING: &str = "Em chưa thể tiếp tục do thiếu dữ liệu.";
pub const VERSION_CHOOSE_BUTTON: &str =
    "Anh/chị vui lòng chọn một trong các nút gợi ý giúp em nhé.";
pub const VERSION_CONFLICT: &str =
    "Nội dung đã cập nhật. Anh/chị muốn tiếp tục hay khởi động lại?";
pub const MORE_HELP: &str = "Em sẽ kết nối hỗ trợ viên để giúp anh/chị chi tiết hơn nhé.";
pub const NO_ACK: &str = "Vâng ạ, nếu cần anh/chị cứ nhắn tiếp nhé.";
pub const ACKNOWLEDGED: &str = "Em đã ghi nhận.";
pub const FALLBACK_ASK: &str = "Em chưa hiểu ý anh/chị. Anh/chị có thể mô tả rõ hơn không?";
pub const STACK_FULL: &str =
    "Anh/chị vui lòng hoàn tất hoặc huỷ quy trình đang làm trước khi bắt đầu quy trình mới nhé.";

pub fn resume_prompt(intent_id: &str) -> String {
    format!("Anh/chị có muốn quay lại **{}** không?", intent_id)
}

pub fn paused_reminder(intent_id: &str) -> String {
    format!(
        "Anh/chị đang tạm dừng **{}**. Vui lòng chọn 'Quay lại' hoặc 'Không' giúp em nhé.",
        intent_id
    )
}
