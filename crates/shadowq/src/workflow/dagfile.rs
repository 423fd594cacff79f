use std::path::Path;

use shadowsim::{Dag, JobType, RuntimeEstimates};

use crate::common::error::SqError;

struct Dependency<'a> {
    line: usize,
    parents: Vec<&'a str>,
    children: Vec<&'a str>,
}

/// Parses the subset of the DAGMan input format produced by the workflow planner.
///
/// `JOB`, `DATA` and `SUBDAG EXTERNAL` define jobs (optionally marked `DONE`), `PARENT .. CHILD ..`
/// defines dependencies. Remaining directives only matter to the workflow engine and are skipped.
pub fn parse_dag(text: &str, path: &Path, estimates: &RuntimeEstimates) -> crate::Result<Dag> {
    let input_error = |line: usize, reason: String| SqError::InputError {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut dag = Dag::new();
    let mut done = Vec::new();
    let mut dependencies = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = fields.first() else {
            continue;
        };
        if keyword.starts_with('#') {
            continue;
        }
        let job_fields = match keyword.to_ascii_uppercase().as_str() {
            "JOB" | "DATA" => &fields[1..],
            "SUBDAG" if fields.get(1).is_some_and(|f| f.eq_ignore_ascii_case("EXTERNAL")) => {
                &fields[2..]
            }
            "PARENT" => {
                let Some(split) = fields
                    .iter()
                    .position(|field| field.eq_ignore_ascii_case("CHILD"))
                else {
                    return Err(input_error(line_number, "PARENT without CHILD".to_string()));
                };
                let parents = fields[1..split].to_vec();
                let children = fields[split + 1..].to_vec();
                if parents.is_empty() || children.is_empty() {
                    return Err(input_error(
                        line_number,
                        "PARENT and CHILD need at least one job each".to_string(),
                    ));
                }
                dependencies.push(Dependency {
                    line: line_number,
                    parents,
                    children,
                });
                continue;
            }
            _ => continue,
        };

        let [name, _submit_file, rest @ ..] = job_fields else {
            return Err(input_error(
                line_number,
                format!("expected `{keyword} <name> <submit-file> [DONE]`"),
            ));
        };
        dag.add_job(
            *name,
            JobType::from_job_name(name),
            estimates.get(name),
        )
        .map_err(|e| input_error(line_number, e.to_string()))?;
        if rest.iter().any(|field| field.eq_ignore_ascii_case("DONE")) {
            done.push(*name);
        }
    }

    for Dependency {
        line,
        parents,
        children,
    } in dependencies
    {
        for parent in &parents {
            for child in &children {
                dag.add_dependency(parent, child)
                    .map_err(|e| input_error(line, e.to_string()))?;
            }
        }
    }
    for name in done {
        dag.mark_done(name, None)?;
    }
    dag.check_acyclic()?;
    Ok(dag)
}

pub fn load_dag_file(path: &Path, estimates: &RuntimeEstimates) -> crate::Result<Dag> {
    let text = std::fs::read_to_string(path)?;
    parse_dag(&text, path, estimates)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use shadowsim::{JobState, JobType, RuntimeEstimates};

    use crate::common::error::SqError;
    use crate::workflow::dagfile::parse_dag;

    const MONTAGE_DAG: &str = r#"
######################################################################
# PEGASUS WMS GENERATED DAG FILE
######################################################################
MAXJOBS projection 2

JOB create_dir_montage_0_local create_dir_montage_0_local.sub
SCRIPT POST create_dir_montage_0_local /usr/bin/pegasus-exitcode create_dir_montage_0_local.out
RETRY create_dir_montage_0_local 3

JOB stage_in_local_local_0 stage_in_local_local_0.sub DONE
JOB mProjectPP_ID1 mProjectPP_ID1.sub
job mProjectPP_ID2 mProjectPP_ID2.sub
DATA mAdd_ID3 mAdd_ID3.sub
JOB register_local_1_0 register_local_1_0.sub
VARS mAdd_ID3 arguments="-p"
CATEGORY mProjectPP_ID1 projection

PARENT create_dir_montage_0_local CHILD stage_in_local_local_0
PARENT stage_in_local_local_0 CHILD mProjectPP_ID1 mProjectPP_ID2
PARENT mProjectPP_ID1 mProjectPP_ID2 child mAdd_ID3
PARENT mAdd_ID3 CHILD register_local_1_0
"#;

    fn estimates() -> RuntimeEstimates {
        let mut estimates = RuntimeEstimates::new(Duration::from_secs(60));
        estimates.insert("mAdd_ID3", Duration::from_secs(300));
        estimates
    }

    #[test]
    fn test_parse_planner_dag() {
        let dag = parse_dag(MONTAGE_DAG, Path::new("montage.dag"), &estimates()).unwrap();
        assert_eq!(dag.job_count(), 6);

        let job = dag.get_job("create_dir_montage_0_local").unwrap();
        assert_eq!(job.job_type(), JobType::CreateDir);
        assert_eq!(job.state(), JobState::Pending);

        let job = dag.get_job("stage_in_local_local_0").unwrap();
        assert_eq!(job.job_type(), JobType::StageIn);
        assert_eq!(job.state(), JobState::Succeeded);
        assert_eq!(job.actual_finish(), None);

        let job = dag.get_job("mAdd_ID3").unwrap();
        assert_eq!(job.job_type(), JobType::Compute);
        assert_eq!(job.runtime_estimate(), Duration::from_secs(300));
        assert_eq!(
            job.parents().collect::<Vec<_>>(),
            vec!["mProjectPP_ID1", "mProjectPP_ID2"]
        );
        assert_eq!(
            dag.get_job("mProjectPP_ID2").unwrap().runtime_estimate(),
            Duration::from_secs(60)
        );
        assert_eq!(
            dag.get_job("register_local_1_0").unwrap().job_type(),
            JobType::Auxiliary
        );
    }

    #[test]
    fn test_subdag_external() {
        let dag = parse_dag(
            "SUBDAG EXTERNAL inner inner.dag\nJOB outer outer.sub\nPARENT inner CHILD outer\n",
            Path::new("x.dag"),
            &estimates(),
        )
        .unwrap();
        assert_eq!(dag.job_count(), 2);
        assert_eq!(
            dag.get_job("outer").unwrap().parents().collect::<Vec<_>>(),
            vec!["inner"]
        );
    }

    #[test]
    fn test_unknown_job_in_dependency() {
        let error = parse_dag(
            "JOB a a.sub\n\nPARENT a CHILD b\n",
            Path::new("x.dag"),
            &estimates(),
        )
        .unwrap_err();
        assert!(matches!(error, SqError::InputError { line: 3, .. }));
        assert_eq!(error.to_string(), "Invalid input x.dag:3: Unknown job `b`");
    }

    #[test]
    fn test_invalid_lines() {
        for text in [
            "JOB a",
            "JOB a a.sub\nJOB a a.sub",
            "JOB a a.sub\nPARENT a",
            "JOB a a.sub\nPARENT CHILD a",
            "JOB a a.sub\nPARENT a CHILD a",
        ] {
            assert!(
                matches!(
                    parse_dag(text, Path::new("x.dag"), &estimates()),
                    Err(SqError::InputError { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_cycle() {
        let error = parse_dag(
            "JOB a a.sub\nJOB b b.sub\nPARENT a CHILD b\nPARENT b CHILD a\n",
            Path::new("x.dag"),
            &estimates(),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            SqError::WorkflowError(shadowsim::Error::CyclicDependency(_))
        ));
    }
}
