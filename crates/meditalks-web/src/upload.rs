use axum::extract::Multipart;

/// An uploaded PDF with its data and filename.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Parsed form fields from the `/api/extract-pdf` upload.
pub struct PdfForm {
    pub file: UploadedFile,
    pub context: Option<String>,
    pub target_language: Option<String>,
}

/// Parse a multipart form upload into structured form fields.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<PdfForm, String> {
    let mut file: Option<UploadedFile> = None;
    let mut context: Option<String> = None;
    let mut target_language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf" => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                check_pdf(&filename, &data)?;
                file = Some(UploadedFile { filename, data });
            }
            "context" | "target_language" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read {}: {}", name, e))?;
                let val = val.trim();
                if !val.is_empty() {
                    if name == "context" {
                        context = Some(val.to_string());
                    } else {
                        target_language = Some(val.to_string());
                    }
                }
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let file = file.ok_or("No PDF file uploaded")?;

    Ok(PdfForm {
        file,
        context,
        target_language,
    })
}

/// Reject uploads that are neither named nor shaped like a PDF.
fn check_pdf(filename: &str, data: &[u8]) -> Result<(), String> {
    if data.is_empty() {
        return Err("Uploaded file is empty".to_string());
    }
    let is_pdf = meditalks_core::extract::is_pdf(data);
    if filename.to_lowercase().ends_with(".pdf") && !is_pdf {
        return Err("File has .pdf extension but doesn't appear to be a valid PDF".to_string());
    }
    if !is_pdf {
        return Err("Unsupported file type. Please upload a PDF file.".to_string());
    }
    Ok(())
}
