//! Prompt templates. Assembly is pure string building: fields are included
//! only when present and requested, so the model never sees empty context
//! lines.

use crate::prompt::{Intent, PromptRequest};

/// Which optional context fields the assembled prompt should carry. Set from
/// the classifier's output, or forced on for directory navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFlags {
    pub include_pwd: bool,
    pub include_file_structure: bool,
}

/// Prompt asking the model to classify a request and report which context it
/// needs. The response contract is defined here and parsed in
/// [`classify`](crate::prompt::classify).
pub fn classification_prompt(user_prompt: &str) -> String {
    format!(
        "You help users with their terminal.\n\n\
         This is the user's request: {user_prompt}.\n\n\
         Provide which type of request it is:\n\
         COMMAND: the user is asking for a single terminal command\n\
         SCRIPT: the user is asking to perform multiple commands or explicitly mentions a script\n\
         NONE: the request is not a terminal request\n\n\
         Your response should only be in this format:\n\
         {{\n\
         \t\"actionType\": \"string value of COMMAND, SCRIPT or NONE\",\n\
         \t\"needsPwd\": \"boolean whether the present working directory is needed to answer\",\n\
         \t\"needsFileStructure\": \"boolean whether the folder's file structure is needed to answer\"\n\
         }}"
    )
}

/// Build the generation prompt for a classified request. `Intent::None`
/// assembles nothing: the caller answers with the fallback instead.
pub fn build(intent: Intent, req: &PromptRequest, ctx: ContextFlags) -> Option<String> {
    match intent {
        Intent::Command => Some(command_prompt(req, ctx)),
        Intent::CommandFromReadme => Some(readme_command_prompt(req, ctx)),
        Intent::Script => Some(script_prompt(req, ctx)),
        Intent::ChangeDirectory => Some(change_directory_prompt(req, ctx)),
        Intent::None => None,
    }
}

fn command_prompt(req: &PromptRequest, ctx: ContextFlags) -> String {
    let mut text = format!(
        "You help with finding terminal commands for a user.\n\n\
         This is the user's request: {}.\n\
         User is on OS: {}\n",
        req.prompt, req.os
    );
    push_context(&mut text, req, ctx);
    text.push_str("\nProvide the relevant terminal command.\n\nYour response should be a terminal command only.");
    text
}

fn readme_command_prompt(req: &PromptRequest, ctx: ContextFlags) -> String {
    let mut text = format!(
        "You help with finding terminal commands for a user.\n\n\
         This is the user's request: {}.\n\
         User is on OS: {}\n\n\
         This is the README of the script: {}\n",
        req.prompt, req.os, req.readme_data
    );
    push_context(&mut text, req, ctx);
    text.push_str("\nProvide the relevant command.\n\nYour response should be a command only.");
    text
}

fn script_prompt(req: &PromptRequest, ctx: ContextFlags) -> String {
    let mut text = format!(
        "You help with making terminal scripts for a user.\n\n\
         This is the user's request: {}.\n\
         User is on OS: {}\n",
        req.prompt, req.os
    );
    if !req.existing_script.is_empty() {
        text.push_str(&format!("This is the current script: {}\n", req.existing_script));
    }
    push_context(&mut text, req, ctx);
    if !req.existing_script.is_empty() {
        text.push_str("\nUpdate the existing terminal script.\n\nYour response should only be script code.");
    } else {
        text.push_str("\nMake a terminal script.\n\nYour response should only be script code.");
    }
    text
}

fn change_directory_prompt(req: &PromptRequest, ctx: ContextFlags) -> String {
    let mut text = format!(
        "You help a user navigate directories in the terminal.\n\n\
         This is the user's request: {}.\n\
         User is on OS: {}\n",
        req.prompt, req.os
    );
    push_context(&mut text, req, ctx);
    text.push_str("\nProvide the cd command that moves the user to the directory they want.\n\n\
                   Your response should be a terminal command only.");
    text
}

/// Prompt asking the model to explain a failed command.
pub fn debug_prompt(command: &str, os: &str, error: &str) -> String {
    format!(
        "You help with finding terminal command errors.\n\n\
         This is the user's command: {command}\n\
         User is on OS: {os}\n\n\
         This is the error from the terminal: {error}.\n\n\
         Provide how the user can fix that."
    )
}

/// Prompt asking the model for the ordered setup commands of a project.
pub fn project_init_prompt(
    files: &[String],
    readme: &str,
    makefile: &str,
    project_folder_name: &str,
) -> String {
    let mut text = format!(
        "You help with running a project.\n\n\
         This is the project folder name: {}\n\
         These are the files of the project: {}\n",
        project_folder_name,
        files.join(",")
    );
    if !readme.is_empty() {
        text.push_str(&format!("This is the README of the project: {readme}\n"));
    }
    if !makefile.is_empty() {
        text.push_str(&format!("This is the MAKEFILE of the project: {makefile}\n"));
    }
    text.push_str(
        "\nThe user has brew installed. But assume nothing else is installed.\n\
         Provide all commands the user needs to run the project.\n\
         (The user is already in the project folder.)\n\
         Start from brew commands to install whatever is needed including the language and tools,\n\
         then the commands to build the project depending on the language,\n\
         and the last command should run the project.\n\n\
         Your response should be in this format:\n\
         {\"projectType\": \"project type such as go, java etc project\", \
         \"commands\": [{\"command\": \"command to execute\", \
         \"description\": \"description of what the command does\"}]}",
    );
    text
}

fn push_context(text: &mut String, req: &PromptRequest, ctx: ContextFlags) {
    if ctx.include_pwd && !req.pwd.is_empty() {
        text.push_str(&format!("User's current working directory is: {}\n", req.pwd));
    }
    if ctx.include_file_structure && !req.current_folder_file_structure.is_empty() {
        text.push_str(&format!(
            "User's current directory file structure is: {}\n",
            req.current_folder_file_structure
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
