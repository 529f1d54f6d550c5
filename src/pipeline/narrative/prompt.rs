use crate::models::PatientInput;

/// Build the differential-diagnosis prompt sent to every LLM backend.
///
/// `model_suggestion` is the classifier's label, when there is one.
pub fn build_prompt(
    symptoms: &[String],
    patient: &PatientInput,
    model_suggestion: Option<&str>,
) -> String {
    let suggestion = match model_suggestion {
        Some(label) => format!(
            "\nA screening model trained on vitals suggested: {label}. \
             Weigh this suggestion against the symptoms; do not assume it is correct.\n"
        ),
        None => String::new(),
    };

    format!(
        "You are an expert medical AI assistant. Based on the following patient information, \
provide a detailed medical analysis:

Patient Information:
- Age: {age} years
- Gender: {gender}
- Blood Pressure: {bp} mmHg
- Glucose Level: {glucose} mg/dL
- Heart Rate: {heart_rate} bpm
- Symptoms: {symptoms}
{suggestion}
Please provide:
1. **Differential Diagnosis** (list 3-5 possible conditions in order of likelihood)
2. **Primary Diagnosis** (most likely condition)
3. **Reasoning** (why this is the most likely diagnosis)
4. **Recommended Tests** (what additional tests should be ordered)
5. **Warning Signs** (symptoms that require immediate medical attention)
6. **General Recommendations** (lifestyle changes, precautions)

Important: This is for educational purposes only. Always consult a qualified healthcare \
professional for medical advice.

Analysis:",
        age = patient.age,
        gender = patient.gender,
        bp = patient.bp,
        glucose = patient.glucose,
        heart_rate = patient.heart_rate,
        symptoms = symptoms.join(", "),
    )
}
