use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::material::{CreateMaterialLog, CreateMaterialType};
use crate::api::supervisor::{
    CreateCheckin, CreateCorrectionRequest, CreateQuestionnaire, ReviewCorrection,
};
use crate::api::time_record::{DayStatus, PunchRequest};
use crate::attendance::{AbsenceRecord, LatenessRecord, PunchKind, WeekSummary};
use crate::model::employee::Employee;
use crate::model::material::{MaterialLogView, MaterialType};
use crate::model::role::Role;
use crate::model::supervisor::{CorrectionRequest, CorrectionStatus, SupervisorCheckin};
use crate::model::time_record::{TimeRecord, TimeRecordView};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Time Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Time Tracker

Clock-in/out recording, supervisor site visits, uniform and PPE deliveries,
and attendance reports for field staff.

### 🔹 Key Features
- **Punch recording**
  - Arrival, lunch start, lunch end and departure with optional location and photo
- **Reports**
  - Lateness, weekly hours worked (overtime and night shift) and absences
  - JSON or PDF through the document renderer
- **Supervisor**
  - Site check-ins, questionnaires and time-record correction requests
- **Materials**
  - Material catalogue and delivery log with replacement dates

### 📦 Response Format
- JSON responses; errors carry a `message` field
- Times are UTC

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::time_record::arrival,
        crate::api::time_record::lunch_start,
        crate::api::time_record::lunch_end,
        crate::api::time_record::departure,
        crate::api::time_record::status,
        crate::api::time_record::history,
        crate::api::time_record::list_time_records,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::report::lateness_report,
        crate::api::report::hours_worked_report,
        crate::api::report::absences_report,

        crate::api::supervisor::create_checkin,
        crate::api::supervisor::list_checkins,
        crate::api::supervisor::submit_questionnaire,
        crate::api::supervisor::create_correction_request,
        crate::api::supervisor::list_correction_requests,
        crate::api::supervisor::approve_correction,
        crate::api::supervisor::reject_correction,

        crate::api::material::create_material_type,
        crate::api::material::list_material_types,
        crate::api::material::update_material_type,
        crate::api::material::delete_material_type,
        crate::api::material::create_material_log,
        crate::api::material::list_material_logs
    ),
    components(
        schemas(
            PunchKind,
            PunchRequest,
            DayStatus,
            TimeRecord,
            TimeRecordView,
            Role,
            CreateEmployee,
            Employee,
            EmployeeListResponse,
            WeekSummary,
            LatenessRecord,
            AbsenceRecord,
            CreateCheckin,
            SupervisorCheckin,
            CreateQuestionnaire,
            CreateCorrectionRequest,
            CorrectionRequest,
            CorrectionStatus,
            ReviewCorrection,
            CreateMaterialType,
            MaterialType,
            CreateMaterialLog,
            MaterialLogView
        )
    ),
    tags(
        (name = "Records", description = "Punch recording APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Reports", description = "Lateness, hours-worked and absence reports"),
        (name = "Supervisor", description = "Supervisor check-ins and correction requests"),
        (name = "Materials", description = "Material catalogue and delivery log"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/record/arrival",
            "/api/admin/employees/{employee_id}",
            "/api/admin/reports/hours-worked",
            "/api/admin/correction-requests/{request_id}/approve",
            "/api/admin/materials/logs",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing from the OpenAPI doc");
        }
    }
}
