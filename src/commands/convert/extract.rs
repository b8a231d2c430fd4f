use super::*;

pub fn extract_layout_text(program: &str, pdf_path: &Path) -> Result<String> {
    let mut command = Command::new(program);
    command.arg("-layout").arg("-enc").arg("UTF-8").arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute {} for {}", program, pdf_path.display()))?;

    if !output.status.success() {
        return Err(ExtractionError {
            program: program.to_string(),
            code: output.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }

    let raw = String::from_utf8_lossy(&output.stdout).into_owned();
    info!(
        program,
        pdf = %pdf_path.display(),
        bytes = raw.len(),
        "extracted layout text"
    );
    Ok(raw)
}

pub fn read_layout_text(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout text {}", path.display()))?;
    info!(path = %path.display(), bytes = raw.len(), "read layout text");
    Ok(raw)
}
