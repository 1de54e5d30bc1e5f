use crate::collaborator::{LabAssignment, LabSolveRequest, LabSolveResponse, LabSolver};
use crate::data::{CourseAssignment, Day, FacultyId, Period, SubjectKind};
use crate::error::CollaboratorError;
use crate::ledger::PeriodRange;
use crate::search::lab_windows;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver,
};
use itertools::Itertools;
use log::{info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Solves the lab sub-problem exactly with the HiGHS ILP solver.
#[derive(Debug, Clone)]
pub struct IlpLabSolver {
    time_limit: Duration,
}

impl Default for IlpLabSolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl IlpLabSolver {
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }
}

impl LabSolver for IlpLabSolver {
    fn name(&self) -> &str {
        "highs-ilp"
    }

    fn solve(&self, request: &LabSolveRequest) -> Result<LabSolveResponse, CollaboratorError> {
        Ok(solve_labs(request, self.time_limit))
    }
}

// x_cdsr = 1 if lab c is held on day d starting at period s in room r
//          0 otherwise
type Candidate = (usize, Day, PeriodRange, usize);

/// Builds and solves the lab ILP. Never fails; problems are reported in the response.
pub fn solve_labs(request: &LabSolveRequest, time_limit: Duration) -> LabSolveResponse {
    let start_time = Instant::now();
    let elapsed_ms = || start_time.elapsed().as_millis() as u64;
    let rules = request.rules.to_rules();

    info!(
        "Setting up lab ILP with {} labs, {} rooms, {} days x {} periods, blocks of {}...",
        request.courses.len(),
        request.rooms.len(),
        rules.days_per_week,
        rules.periods_per_day,
        rules.lab_block_length
    );

    let malformed: Vec<String> = request
        .faculty_availability
        .iter()
        .filter(|w| {
            w.day >= rules.days_per_week
                || w.start_period == 0
                || w.start_period > w.end_period
                || w.end_period > rules.periods_per_day
        })
        .map(|w| format!("{} day {} P{}-P{}", w.faculty_id, w.day, w.start_period, w.end_period))
        .collect();
    if !malformed.is_empty() {
        warn!("Rejecting lab request with malformed availability windows: {:?}", malformed);
        return LabSolveResponse::error(
            format!("Malformed availability windows: {}", malformed.join(", ")),
            elapsed_ms(),
        );
    }

    // lookups
    let availability: HashMap<&FacultyId, Vec<(Day, PeriodRange)>> = request
        .faculty_availability
        .iter()
        .map(|w| (&w.faculty_id, (w.day, PeriodRange::new(w.start_period, w.end_period))))
        .into_group_map();
    let windows = lab_windows(&rules);

    // pre-filter for performance; implicitly handles capacity, kind, availability and day rules
    let mut candidates: Vec<Candidate> = Vec::new();
    for (c_idx, course) in request.courses.iter().enumerate() {
        for day in rules.days() {
            for &range in &windows {
                if range.end > rules.last_period(day, course.year_level) {
                    continue;
                }
                if !faculty_available(&availability, &course.faculty_id, day, range) {
                    continue;
                }
                for (r_idx, room) in request.rooms.iter().enumerate() {
                    if room.kind == SubjectKind::Lab && room.capacity >= course.student_count {
                        candidates.push((c_idx, day, range, r_idx));
                    }
                }
            }
        }
    }
    trace!(
        "Generated {} candidate placements for {} labs.",
        candidates.len(),
        request.courses.len()
    );

    let by_course = candidates
        .iter()
        .enumerate()
        .map(|(v_idx, (c_idx, ..))| (*c_idx, v_idx))
        .into_group_map();
    let stranded: Vec<String> = request
        .courses
        .iter()
        .enumerate()
        .filter(|(c_idx, _)| !by_course.contains_key(c_idx))
        .map(|(_, course)| diagnose_stranded(course, request))
        .collect();
    if !stranded.is_empty() {
        warn!("{} lab(s) have no admissible placement", stranded.len());
        return LabSolveResponse::infeasible(
            format!(
                "Cannot schedule {} lab(s):\n{}",
                stranded.len(),
                stranded.join("\n")
            ),
            elapsed_ms(),
        );
    }
    if request.courses.is_empty() {
        return LabSolveResponse {
            success: true,
            status: "OPTIMAL".to_string(),
            message: "No labs to schedule".to_string(),
            assignments: Vec::new(),
            solve_time_ms: elapsed_ms(),
        };
    }

    // decision variables
    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = problem.add_vector(variable().binary(), candidates.len());

    // objective: prefer exact capacity matches
    let capacity_waste: Expression = candidates
        .iter()
        .zip(&vars)
        .map(|((c_idx, _, _, r_idx), var)| {
            let waste = request.rooms[*r_idx]
                .capacity
                .saturating_sub(request.courses[*c_idx].student_count);
            f64::from(waste) * *var
        })
        .sum();

    let mut model = problem
        .minimise(capacity_waste)
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", 1234) //set seed for reproducibility
        .set_option("time_limit", time_limit.as_secs_f64())
        .set_option("log_to_console", "false");

    // each lab scheduled exactly once
    info!("Adding 'lab scheduled once' constraints...");
    for (_, v_indices) in by_course.iter().sorted_by_key(|(c_idx, _)| **c_idx) {
        let once: Expression = v_indices.iter().map(|&v| vars[v]).sum();
        model.add_constraint(constraint!(once == 1));
    }

    // no room, section or faculty double-booking, per (day, period)
    info!("Adding 'no room/section/faculty overlap' constraints...");
    let mut occupancy: BTreeMap<(u8, &str, Day, Period), Vec<Variable>> = BTreeMap::new();
    for ((c_idx, day, range, r_idx), var) in candidates.iter().zip(&vars) {
        let course = &request.courses[*c_idx];
        for period in range.periods() {
            for (tag, id) in [
                (0, request.rooms[*r_idx].id.as_str()),
                (1, course.section_id.as_str()),
                (2, course.faculty_id.as_str()),
            ] {
                occupancy.entry((tag, id, *day, period)).or_default().push(*var);
            }
        }
    }
    for busy in occupancy.into_values().filter(|v| v.len() > 1) {
        let busy: Expression = busy.into_iter().sum();
        model.add_constraint(constraint!(busy <= 1));
    }

    //solve
    info!("Starting ILP solver...");
    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            return LabSolveResponse::infeasible(
                "No feasible lab schedule exists. Add lab rooms, widen faculty availability or reduce sections.",
                elapsed_ms(),
            );
        }
        Err(e) => {
            return LabSolveResponse::error(format!("Solver error: {}", e), elapsed_ms());
        }
    };

    // get assignments from solution
    let mut assignments: Vec<LabAssignment> = candidates
        .iter()
        .zip(&vars)
        .filter(|(_, var)| solution.value(**var) > 0.9)
        .map(|((c_idx, day, range, r_idx), _)| {
            let course = &request.courses[*c_idx];
            LabAssignment {
                section_id: course.section_id.clone(),
                subject_id: course.subject_id.clone(),
                day: *day,
                start_period: range.start,
                end_period: range.end,
                room_id: request.rooms[*r_idx].id.clone(),
            }
        })
        .collect();
    assignments.sort();

    // a time-limited run may stop without a complete incumbent
    if assignments.len() != request.courses.len() {
        return LabSolveResponse::error(
            format!(
                "Solver stopped with {} of {} labs placed",
                assignments.len(),
                request.courses.len()
            ),
            elapsed_ms(),
        );
    }

    let solve_time_ms = elapsed_ms();
    info!("Solution found in {}ms", solve_time_ms);
    LabSolveResponse {
        success: true,
        status: "FEASIBLE".to_string(),
        message: format!("Successfully scheduled {} labs", assignments.len()),
        assignments,
        solve_time_ms,
    }
}

fn faculty_available(
    availability: &HashMap<&FacultyId, Vec<(Day, PeriodRange)>>,
    faculty_id: &FacultyId,
    day: Day,
    range: PeriodRange,
) -> bool {
    match availability.get(faculty_id) {
        None => true,
        Some(windows) => windows.iter().any(|(d, w)| *d == day && w.contains(&range)),
    }
}

fn diagnose_stranded(course: &CourseAssignment, request: &LabSolveRequest) -> String {
    let mut reasons = Vec::new();
    let suitable_rooms = request
        .rooms
        .iter()
        .filter(|r| r.kind == SubjectKind::Lab && r.capacity >= course.student_count)
        .count();
    if suitable_rooms == 0 {
        reasons.push(format!("no lab room with capacity >= {}", course.student_count));
    }
    let windows = request
        .faculty_availability
        .iter()
        .filter(|w| w.faculty_id == course.faculty_id)
        .count();
    if windows > 0 {
        reasons.push(format!(
            "faculty {} windows ({}) hold no {}-period block",
            course.faculty_id, windows, request.rules.block_length
        ));
    }
    if reasons.is_empty() {
        reasons.push("no day admits the block".to_string());
    }
    format!(
        "  - {}:{} ({} students): {}",
        course.section_id,
        course.subject_id,
        course.student_count,
        reasons.join(" | ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::LabRules;
    use crate::data::{ClassroomOption, FacultyAvailabilityWindow};
    use crate::rules::SchedulingRules;

    fn lab(section: &str, faculty: &str, students: u32) -> CourseAssignment {
        CourseAssignment {
            section_id: section.into(),
            subject_id: "PHYL".into(),
            subject_kind: SubjectKind::Lab,
            periods_per_week: 4,
            faculty_id: faculty.into(),
            student_count: students,
            year_level: 2,
        }
    }

    fn lab_room(id: &str, capacity: u32) -> ClassroomOption {
        ClassroomOption {
            id: id.into(),
            capacity,
            kind: SubjectKind::Lab,
        }
    }

    fn request(courses: Vec<CourseAssignment>, rooms: Vec<ClassroomOption>) -> LabSolveRequest {
        LabSolveRequest {
            courses,
            rooms,
            faculty_availability: vec![],
            rules: LabRules::from_rules(&SchedulingRules::default()),
        }
    }

    #[test]
    fn test_places_every_lab_without_overlap() {
        let req = request(
            vec![lab("S1", "F1", 30), lab("S2", "F1", 30), lab("S3", "F2", 30)],
            vec![lab_room("L1", 40)],
        );
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(response.success, "{}", response.message);
        assert_eq!(response.assignments.len(), 3);
        for (a, b) in response.assignments.iter().tuple_combinations() {
            let disjoint = a.day != b.day || a.end_period < b.start_period || b.end_period < a.start_period;
            assert!(disjoint, "{:?} overlaps {:?}", a, b);
        }
        for a in &response.assignments {
            assert_eq!(a.end_period - a.start_period + 1, 4);
        }
    }

    #[test]
    fn test_prefers_tightest_room() {
        let req = request(vec![lab("S1", "F1", 30)], vec![lab_room("HUGE", 120), lab_room("FIT", 30)]);
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(response.success);
        assert_eq!(response.assignments[0].room_id, "FIT");
    }

    #[test]
    fn test_stranded_lab_is_infeasible() {
        let req = request(vec![lab("S1", "F1", 80)], vec![lab_room("L1", 40)]);
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(!response.success);
        assert_eq!(response.status, "INFEASIBLE");
        assert!(response.message.contains("S1:PHYL"));
    }

    #[test]
    fn test_respects_availability_window() {
        let mut req = request(vec![lab("S1", "F1", 30)], vec![lab_room("L1", 40)]);
        req.faculty_availability.push(FacultyAvailabilityWindow {
            faculty_id: "F1".into(),
            day: 3,
            start_period: 5,
            end_period: 8,
        });
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(response.success);
        let a = &response.assignments[0];
        assert_eq!((a.day, a.start_period, a.end_period), (3, 5, 8));
    }

    #[test]
    fn test_too_many_labs_for_one_room_is_infeasible() {
        // 6 days x 2 blocks, minus the partial day afternoon, leaves 11 blocks
        let courses = (0..12).map(|i| lab(&format!("S{}", i), &format!("F{}", i), 20)).collect();
        let req = request(courses, vec![lab_room("L1", 40)]);
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(!response.success);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let mut req = request(vec![lab("S1", "F1", 30)], vec![lab_room("L1", 40)]);
        req.faculty_availability.push(FacultyAvailabilityWindow {
            faculty_id: "F1".into(),
            day: 1,
            start_period: 6,
            end_period: 2,
        });
        let response = solve_labs(&req, Duration::from_secs(10));
        assert!(!response.success);
        assert_eq!(response.status, "ERROR");
        assert!(response.message.contains("F1 day 1 P6-P2"));
        assert!(response.assignments.is_empty());
    }
}
